//! In-memory [PageStore] guarded by a single [RwLock].
//!
//! A commit stages the whole batch against a copy of the table and swaps it in only when every
//! event applied cleanly, all while holding the write lock. Readers therefore see either the table
//! before the batch or the table after it.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::PageError,
    event::PageEvent,
    properties::{Page, PageId, PageStatus},
    store::{status_matches, PageStore},
};

#[derive(Debug, Clone, Default)]
struct PageTable {
    pages: BTreeMap<PageId, Page>,
    last_id: u64,
}

impl PageTable {
    fn page_mut(&mut self, id: &PageId) -> Result<&mut Page, PageError> {
        self.pages.get_mut(id).ok_or_else(|| PageError::missing(*id))
    }

    fn check_parent(&self, id: Option<PageId>, parent_id: PageId) -> Result<(), PageError> {
        if Some(parent_id) == id {
            return Err(PageError::Store(format!("page {parent_id} cannot parent itself")));
        }
        if !parent_id.is_root() && !self.pages.contains_key(&parent_id) {
            return Err(PageError::Store(format!(
                "parent page {parent_id} does not exist"
            )));
        }
        Ok(())
    }

    fn apply(&mut self, event: PageEvent, created: &mut Vec<PageId>) -> Result<(), PageError> {
        match event {
            PageEvent::PageCreated(new_page, lookup, order) => {
                self.check_parent(None, new_page.parent_id)?;
                self.last_id += 1;
                let id = PageId(self.last_id);
                if new_page.is_home {
                    self.clear_home();
                }
                self.pages.insert(id, new_page.into_page(id, lookup, order));
                created.push(id);
            }
            PageEvent::LookupUpdated(id, lookup) => {
                self.page_mut(&id)?.lookup = lookup;
            }
            PageEvent::PageMoved(id, parent_id, order) => {
                self.check_parent(Some(id), parent_id)?;
                let page = self.page_mut(&id)?;
                page.parent_id = parent_id;
                page.order = order;
            }
            PageEvent::SlugChanged(id, slug) => {
                self.page_mut(&id)?.slug = slug;
            }
            PageEvent::HomeSet(id) => {
                if !self.pages.contains_key(&id) {
                    return Err(PageError::missing(id));
                }
                self.clear_home();
                self.page_mut(&id)?.is_home = true;
            }
            PageEvent::PagesRemoved(ids) => {
                for id in ids.iter() {
                    self.pages.remove(id);
                }
            }
        }
        Ok(())
    }

    /// Fails if following parents up from `id` revisits a page.
    fn check_acyclic(&self, id: PageId) -> Result<(), PageError> {
        let mut seen = BTreeSet::new();
        let mut current = id;
        while !current.is_root() {
            if !seen.insert(current) {
                return Err(PageError::inconsistent(
                    id,
                    format!("parent chain loops back to page {current}"),
                ));
            }
            match self.pages.get(&current) {
                Some(page) => current = page.parent_id,
                None => break,
            }
        }
        Ok(())
    }

    fn clear_home(&mut self) {
        for page in self.pages.values_mut() {
            page.is_home = false;
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<PageTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Seed a store with existing rows (ids included). Lookups are taken as given; rebuild them
    /// with [crate::tree::PageTree::rebuild_all] if they may be stale.
    pub fn from_pages<I: IntoIterator<Item = Page>>(pages: I) -> Result<Self, PageError> {
        let mut table = PageTable::default();
        for page in pages {
            if page.id.is_root() {
                return Err(PageError::Config(format!(
                    "page '{}' uses the reserved root id {}",
                    page.slug,
                    PageId::ROOT
                )));
            }
            table.last_id = table.last_id.max(page.id.0);
            if let Some(existing) = table.pages.insert(page.id, page) {
                return Err(PageError::Config(format!(
                    "duplicate page id {} ('{}')",
                    existing.id, existing.slug
                )));
            }
        }
        tracing::debug!("Seeded memory store with {} pages", table.pages.len());
        Ok(MemoryStore {
            table: RwLock::new(table),
        })
    }

    /// Snapshot of every page, ordered by id.
    pub fn pages(&self) -> Vec<Page> {
        self.table.read().pages.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().pages.is_empty()
    }
}

impl PageStore for MemoryStore {
    async fn get_by_id(&self, id: PageId) -> Result<Option<Page>, PageError> {
        Ok(self.table.read().pages.get(&id).cloned())
    }

    async fn get_by_exact_path(
        &self,
        path: &str,
        status: Option<PageStatus>,
    ) -> Result<Option<Page>, PageError> {
        Ok(self
            .table
            .read()
            .pages
            .values()
            .find(|page| page.lookup == path && status_matches(page, status))
            .cloned())
    }

    async fn get_home(&self, status: Option<PageStatus>) -> Result<Option<Page>, PageError> {
        Ok(self
            .table
            .read()
            .pages
            .values()
            .find(|page| page.is_home && status_matches(page, status))
            .cloned())
    }

    async fn get_children(&self, parent_id: PageId) -> Result<Vec<Page>, PageError> {
        let mut children = self
            .table
            .read()
            .pages
            .values()
            .filter(|page| page.parent_id == parent_id && page.id != parent_id)
            .cloned()
            .collect::<Vec<Page>>();
        children.sort_by_key(|page| (page.order, page.id));
        Ok(children)
    }

    async fn count_siblings_with_slug(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<usize, PageError> {
        Ok(self
            .table
            .read()
            .pages
            .values()
            .filter(|page| page.id != exclude_id && page.parent_id == parent_id && page.slug == slug)
            .count())
    }

    #[tracing::instrument(skip_all, fields(events = events.len()))]
    async fn commit(&self, events: Vec<PageEvent>) -> Result<Vec<PageId>, PageError> {
        let mut table = self.table.write();
        let mut staged = table.clone();
        let mut created = Vec::new();
        let mut moved = Vec::new();
        for event in events {
            tracing::debug!("applying {event}");
            if let PageEvent::PageMoved(id, ..) = &event {
                moved.push(*id);
            }
            if let Err(e) = staged.apply(event, &mut created) {
                tracing::warn!("commit rolled back: {e}");
                return Err(e);
            }
        }
        for id in moved {
            if let Err(e) = staged.check_acyclic(id) {
                tracing::warn!("commit rolled back: {e}");
                return Err(e);
            }
        }
        *table = staged;
        Ok(created)
    }
}
