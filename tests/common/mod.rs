//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use pagetree::{
    config::PageFixture,
    properties::{NewPage, PageId},
    store::PageStore,
    tree::PageTree,
};
use std::path::PathBuf;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Path to a fixture under `tests/fixtures/`.
#[allow(dead_code)]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[allow(dead_code)]
pub fn load_site() -> PageFixture {
    PageFixture::load(fixture_path("site.toml")).unwrap()
}

/// Recreate the pages of `fixture` through [PageTree::create_page], in id order, so any store
/// ends up with the same shape. Returns a map from fixture id to the id the store assigned.
#[allow(dead_code)]
pub async fn replay_fixture<S: PageStore>(
    tree: &PageTree<S>,
    fixture: &PageFixture,
) -> std::collections::BTreeMap<PageId, PageId> {
    let mut assigned = std::collections::BTreeMap::new();
    assigned.insert(PageId::ROOT, PageId::ROOT);
    let mut pages = fixture.pages.clone();
    pages.sort_by_key(|page| page.id);
    for page in pages {
        let new_page = NewPage {
            slug: page.slug.clone(),
            title: page.title.clone(),
            parent_id: assigned[&page.parent_id],
            order: Some(page.order),
            status: page.status,
            is_home: page.is_home,
            strict_uri: page.strict_uri,
            payload: page.payload.clone(),
        };
        let created = tree.create_page(new_page).await.unwrap();
        assigned.insert(page.id, created.id);
    }
    assigned
}
