//! SQLite-backed [PageStore].
//!
//! Each [PageStore::commit] runs inside one SQL transaction. Any failing statement returns early,
//! dropping the transaction, which rolls the whole batch back.

use crate::{
    error::PageError,
    event::PageEvent,
    properties::{Page, PageId, PageStatus},
    store::PageStore,
};
use futures_core::future::BoxFuture;
use sqlx::{
    error::BoxDynError,
    migrate::{MigrateDatabase, Migration as SqlxMigration, MigrationSource, MigrationType, Migrator},
    sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection, SqliteRow},
    ConnectOptions, Pool, Row,
};
use std::{collections::BTreeSet, path::PathBuf, str::FromStr};

const PAGE_COLUMNS: &str =
    "id, slug, title, parent_id, uri, ordering, status, is_home, strict_uri, payload";

#[derive(Debug, Clone)]
pub struct DbConnection(pub Pool<Sqlite>);

fn to_db_id(id: PageId) -> Result<i64, PageError> {
    i64::try_from(id.0).map_err(|_| PageError::Store(format!("page id {id} out of range")))
}

fn from_db_id(id: i64) -> Result<PageId, PageError> {
    u64::try_from(id)
        .map(PageId)
        .map_err(|_| PageError::Store(format!("negative page id {id} in database")))
}

fn page_from_row(row: &SqliteRow) -> Result<Page, PageError> {
    let status: String = row.try_get("status")?;
    let payload: String = row.try_get("payload")?;
    let ordering: i64 = row.try_get("ordering")?;
    Ok(Page {
        id: from_db_id(row.try_get("id")?)?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        parent_id: from_db_id(row.try_get("parent_id")?)?,
        lookup: row.try_get("uri")?,
        order: u32::try_from(ordering)
            .map_err(|_| PageError::Store(format!("invalid sibling order {ordering}")))?,
        status: PageStatus::from_str(&status)?,
        is_home: row.try_get("is_home")?,
        strict_uri: row.try_get("strict_uri")?,
        payload: serde_json::from_str(&payload)?,
    })
}

async fn page_exists(conn: &mut SqliteConnection, id: PageId) -> Result<bool, PageError> {
    let row = sqlx::query("SELECT 1 FROM pages WHERE id = ?")
        .bind(to_db_id(id)?)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn check_parent(
    conn: &mut SqliteConnection,
    id: Option<PageId>,
    parent_id: PageId,
) -> Result<(), PageError> {
    if Some(parent_id) == id {
        return Err(PageError::Store(format!("page {parent_id} cannot parent itself")));
    }
    if !parent_id.is_root() && !page_exists(conn, parent_id).await? {
        return Err(PageError::Store(format!(
            "parent page {parent_id} does not exist"
        )));
    }
    Ok(())
}

/// Fails if following parents up from `id` revisits a page.
async fn check_acyclic(conn: &mut SqliteConnection, id: PageId) -> Result<(), PageError> {
    let mut seen = BTreeSet::new();
    let mut current = id;
    while !current.is_root() {
        if !seen.insert(current) {
            return Err(PageError::inconsistent(
                id,
                format!("parent chain loops back to page {current}"),
            ));
        }
        let row = sqlx::query("SELECT parent_id FROM pages WHERE id = ?")
            .bind(to_db_id(current)?)
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => current = from_db_id(row.try_get("parent_id")?)?,
            None => break,
        }
    }
    Ok(())
}

/// Run one event against an open transaction. Returns the id of a created page.
async fn apply_event(
    conn: &mut SqliteConnection,
    event: PageEvent,
) -> Result<Option<PageId>, PageError> {
    match event {
        PageEvent::PageCreated(new_page, lookup, order) => {
            check_parent(conn, None, new_page.parent_id).await?;
            if new_page.is_home {
                sqlx::query("UPDATE pages SET is_home = 0 WHERE is_home = 1")
                    .execute(&mut *conn)
                    .await?;
            }
            let result = sqlx::query(
                "INSERT INTO pages \
                 (slug, title, parent_id, uri, ordering, status, is_home, strict_uri, payload) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&new_page.slug)
            .bind(&new_page.title)
            .bind(to_db_id(new_page.parent_id)?)
            .bind(&lookup)
            .bind(i64::from(order))
            .bind(new_page.status.as_str())
            .bind(new_page.is_home)
            .bind(new_page.strict_uri)
            .bind(new_page.payload.to_string())
            .execute(&mut *conn)
            .await?;
            return Ok(Some(from_db_id(result.last_insert_rowid())?));
        }
        PageEvent::LookupUpdated(id, lookup) => {
            let result = sqlx::query("UPDATE pages SET uri = ? WHERE id = ?")
                .bind(&lookup)
                .bind(to_db_id(id)?)
                .execute(&mut *conn)
                .await?;
            if result.rows_affected() == 0 {
                return Err(PageError::missing(id));
            }
        }
        PageEvent::PageMoved(id, parent_id, order) => {
            check_parent(conn, Some(id), parent_id).await?;
            let result = sqlx::query("UPDATE pages SET parent_id = ?, ordering = ? WHERE id = ?")
                .bind(to_db_id(parent_id)?)
                .bind(i64::from(order))
                .bind(to_db_id(id)?)
                .execute(&mut *conn)
                .await?;
            if result.rows_affected() == 0 {
                return Err(PageError::missing(id));
            }
        }
        PageEvent::SlugChanged(id, slug) => {
            let result = sqlx::query("UPDATE pages SET slug = ? WHERE id = ?")
                .bind(&slug)
                .bind(to_db_id(id)?)
                .execute(&mut *conn)
                .await?;
            if result.rows_affected() == 0 {
                return Err(PageError::missing(id));
            }
        }
        PageEvent::HomeSet(id) => {
            if !page_exists(conn, id).await? {
                return Err(PageError::missing(id));
            }
            sqlx::query("UPDATE pages SET is_home = 0 WHERE is_home = 1")
                .execute(&mut *conn)
                .await?;
            sqlx::query("UPDATE pages SET is_home = 1 WHERE id = ?")
                .bind(to_db_id(id)?)
                .execute(&mut *conn)
                .await?;
        }
        PageEvent::PagesRemoved(ids) => {
            for id in ids {
                sqlx::query("DELETE FROM pages WHERE id = ?")
                    .bind(to_db_id(id)?)
                    .execute(&mut *conn)
                    .await?;
            }
        }
    }
    Ok(None)
}

impl PageStore for DbConnection {
    async fn get_by_id(&self, id: PageId) -> Result<Option<Page>, PageError> {
        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?"))
            .bind(to_db_id(id)?)
            .fetch_optional(&self.0)
            .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_exact_path(
        &self,
        path: &str,
        status: Option<PageStatus>,
    ) -> Result<Option<Page>, PageError> {
        let status = status.map(|s| s.as_str());
        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages \
             WHERE uri = ? AND (? IS NULL OR status = ?) ORDER BY id LIMIT 1"
        ))
        .bind(path)
        .bind(status)
        .bind(status)
        .fetch_optional(&self.0)
        .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn get_home(&self, status: Option<PageStatus>) -> Result<Option<Page>, PageError> {
        let status = status.map(|s| s.as_str());
        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages \
             WHERE is_home = 1 AND (? IS NULL OR status = ?) ORDER BY id LIMIT 1"
        ))
        .bind(status)
        .bind(status)
        .fetch_optional(&self.0)
        .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn get_children(&self, parent_id: PageId) -> Result<Vec<Page>, PageError> {
        let parent = to_db_id(parent_id)?;
        let rows = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages \
             WHERE parent_id = ? AND id != ? ORDER BY ordering, id"
        ))
        .bind(parent)
        .bind(parent)
        .fetch_all(&self.0)
        .await?;
        rows.iter().map(page_from_row).collect()
    }

    async fn count_siblings_with_slug(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<usize, PageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) FROM pages WHERE id != ? AND slug = ? AND parent_id = ?",
        )
        .bind(to_db_id(exclude_id)?)
        .bind(slug)
        .bind(to_db_id(parent_id)?)
        .fetch_one(&self.0)
        .await?;
        let count: i64 = row.try_get(0)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    #[tracing::instrument(skip_all, fields(events = events.len()))]
    async fn commit(&self, events: Vec<PageEvent>) -> Result<Vec<PageId>, PageError> {
        let mut tx = self.0.begin().await?;
        let mut created = Vec::new();
        let mut moved = Vec::new();
        for event in events {
            tracing::debug!("applying {event}");
            if let PageEvent::PageMoved(id, ..) = &event {
                moved.push(*id);
            }
            if let Some(id) = apply_event(&mut tx, event).await? {
                created.push(id);
            }
        }
        for id in moved {
            check_acyclic(&mut tx, id).await?;
        }
        tx.commit().await?;
        Ok(created)
    }
}

/// Schema history, applied in version order: (version, description, sql).
const PAGE_MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "create_pages",
    "CREATE TABLE pages (\
        id INTEGER PRIMARY KEY AUTOINCREMENT, \
        slug TEXT NOT NULL, \
        title TEXT NOT NULL DEFAULT '', \
        parent_id INTEGER NOT NULL DEFAULT 0, \
        uri TEXT NOT NULL DEFAULT '', \
        ordering INTEGER NOT NULL DEFAULT 0, \
        status TEXT NOT NULL DEFAULT 'live', \
        is_home BOOLEAN NOT NULL DEFAULT 0, \
        strict_uri BOOLEAN NOT NULL DEFAULT 0, \
        payload TEXT NOT NULL DEFAULT 'null'); \
    CREATE INDEX pages_uri ON pages(uri); \
    CREATE INDEX pages_parent ON pages(parent_id, ordering);",
)];

#[derive(Debug)]
struct PageMigrations;

impl MigrationSource<'static> for PageMigrations {
    fn resolve(self) -> BoxFuture<'static, Result<Vec<SqlxMigration>, BoxDynError>> {
        Box::pin(async move {
            Ok(PAGE_MIGRATIONS
                .iter()
                .map(|(version, description, sql)| {
                    SqlxMigration::new(
                        *version,
                        (*description).into(),
                        MigrationType::Simple,
                        (*sql).into(),
                        false,
                    )
                })
                .collect())
        })
    }
}

pub async fn db_init(db_path: PathBuf) -> Result<Pool<Sqlite>, PageError> {
    let fqdb = format!("sqlite:{}", db_path.to_string_lossy());
    tracing::debug!("Initializing page db from file: {:?}", fqdb);
    if !Sqlite::database_exists(&fqdb).await.unwrap_or(false) {
        Sqlite::create_database(&fqdb).await?;
    }
    let options = SqliteConnectOptions::from_str(&fqdb)?
        .read_only(false)
        .disable_statement_logging()
        .create_if_missing(true);

    let pool = sqlx::pool::PoolOptions::<Sqlite>::new()
        .connect_with(options)
        .await?;

    let migrator = Migrator::new(PageMigrations).await?;
    migrator.run(&pool).await?;

    let count_res = sqlx::query("SELECT COUNT(*) FROM pages;")
        .fetch_one(&pool)
        .await?;
    tracing::info!(
        "DB Connection initialized.\n \
         \tCached page count:\t{:?}",
        count_res.try_get::<i64, usize>(0)?
    );

    Ok(pool)
}
