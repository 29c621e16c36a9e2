//! Shared test utilities for page tree testing

use crate::{
    config::TreeConfig,
    error::PageError,
    event::PageEvent,
    lookup::LookupBuilder,
    properties::{NewPage, Page, PageId, PageStatus},
    store::{MemoryStore, PageStore},
    tree::PageTree,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Ids of the pages created by [sample_tree].
#[derive(Debug, Clone, Copy)]
pub struct SampleIds {
    pub home: PageId,
    pub a: PageId,
    pub b: PageId,
    pub c: PageId,
    pub strict: PageId,
    pub draft: PageId,
    pub x: PageId,
}

pub fn titled(slug: &str, parent_id: PageId) -> NewPage {
    let mut new_page = NewPage::new(slug, parent_id);
    new_page.title = slug.to_uppercase();
    new_page
}

/// Build the tree used by most tests:
///
/// ```text
/// home        (home page)
/// a
/// ├── b
/// │   └── c
/// ├── strict  (strict_uri)
/// └── draft   (draft status)
/// x
/// ```
pub async fn sample_tree_with(config: TreeConfig) -> (PageTree<MemoryStore>, SampleIds) {
    init_logging();
    let tree = PageTree::new(MemoryStore::new(), config);

    let mut home = titled("home", PageId::ROOT);
    home.is_home = true;
    let home = tree.create_page(home).await.unwrap().id;
    let a = tree.create_page(titled("a", PageId::ROOT)).await.unwrap().id;
    let b = tree.create_page(titled("b", a)).await.unwrap().id;
    let c = tree.create_page(titled("c", b)).await.unwrap().id;
    let mut strict = titled("strict", a);
    strict.strict_uri = true;
    let strict = tree.create_page(strict).await.unwrap().id;
    let mut draft = titled("draft", a);
    draft.status = PageStatus::Draft;
    let draft = tree.create_page(draft).await.unwrap().id;
    let x = tree.create_page(titled("x", PageId::ROOT)).await.unwrap().id;

    (
        tree,
        SampleIds {
            home,
            a,
            b,
            c,
            strict,
            draft,
            x,
        },
    )
}

pub async fn sample_tree() -> (PageTree<MemoryStore>, SampleIds) {
    sample_tree_with(TreeConfig::default()).await
}

/// A bare page row for seeding a [MemoryStore] directly, lookups left as given.
pub fn seeded_page(id: u64, slug: &str, parent_id: u64, lookup: &str) -> Page {
    Page {
        id: PageId(id),
        slug: slug.to_string(),
        parent_id: PageId(parent_id),
        lookup: lookup.to_string(),
        ..Default::default()
    }
}

pub async fn lookup_of(tree: &PageTree<MemoryStore>, id: PageId) -> String {
    tree.store().get_by_id(id).await.unwrap().unwrap().lookup
}

/// Every stored lookup equals the slugs along its parent chain, and no chain loops.
pub async fn assert_lookups_consistent(store: &MemoryStore, config: &TreeConfig) {
    let builder = LookupBuilder::new(store, config);
    for page in store.pages() {
        assert_eq!(
            page.lookup,
            builder.build_lookup(page.id).await.unwrap(),
            "stale lookup on page {}",
            page.id
        );
        if page.parent_id.is_root() {
            assert_eq!(page.lookup, page.slug);
        } else {
            let parent = store.get_by_id(page.parent_id).await.unwrap().unwrap();
            assert_eq!(page.lookup, format!("{}/{}", parent.lookup, page.slug));
        }
    }
}

/// Hands control back to the runtime before every store call, so concurrent operations on a
/// single-threaded runtime interleave at each read and write.
#[derive(Debug, Default)]
pub struct YieldingStore(pub MemoryStore);

impl PageStore for YieldingStore {
    async fn get_by_id(&self, id: PageId) -> Result<Option<Page>, PageError> {
        tokio::task::yield_now().await;
        self.0.get_by_id(id).await
    }

    async fn get_by_exact_path(
        &self,
        path: &str,
        status: Option<PageStatus>,
    ) -> Result<Option<Page>, PageError> {
        tokio::task::yield_now().await;
        self.0.get_by_exact_path(path, status).await
    }

    async fn get_home(&self, status: Option<PageStatus>) -> Result<Option<Page>, PageError> {
        tokio::task::yield_now().await;
        self.0.get_home(status).await
    }

    async fn get_children(&self, parent_id: PageId) -> Result<Vec<Page>, PageError> {
        tokio::task::yield_now().await;
        self.0.get_children(parent_id).await
    }

    async fn count_siblings_with_slug(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<usize, PageError> {
        tokio::task::yield_now().await;
        self.0
            .count_siblings_with_slug(slug, parent_id, exclude_id)
            .await
    }

    async fn commit(&self, events: Vec<PageEvent>) -> Result<Vec<PageId>, PageError> {
        tokio::task::yield_now().await;
        self.0.commit(events).await
    }
}

/// `a/b` and `x` behind a [YieldingStore].
pub async fn yielding_tree() -> (PageTree<YieldingStore>, PageId, PageId, PageId) {
    init_logging();
    let tree = PageTree::new(YieldingStore::default(), TreeConfig::default());
    let a = tree.create_page(titled("a", PageId::ROOT)).await.unwrap().id;
    let b = tree.create_page(titled("b", a)).await.unwrap().id;
    let x = tree.create_page(titled("x", PageId::ROOT)).await.unwrap().id;
    (tree, a, b, x)
}
