use crate::{
    config::TreeConfig,
    paths::RequestPath,
    properties::{PageId, PageStatus},
    store::MemoryStore,
    tests::helpers::{init_logging, sample_tree, sample_tree_with, titled},
    tree::PageTree,
};
use test_log::test;

#[test(tokio::test)]
async fn empty_request_resolves_home() {
    let (tree, ids) = sample_tree().await;
    for request in [RequestPath::Empty, RequestPath::from("/"), RequestPath::from("")] {
        let resolved = tree.resolve(request, true).await.unwrap().unwrap();
        assert_eq!(resolved.page.id, ids.home);
        assert_eq!(resolved.base_uri, "");
    }
    let resolved = tree
        .resolve(RequestPath::Segments(vec![]), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.page.id, ids.home);
}

#[test(tokio::test)]
async fn missing_home_resolves_nothing() {
    init_logging();
    let tree = PageTree::new(MemoryStore::new(), TreeConfig::default());
    tree.create_page(titled("a", PageId::ROOT)).await.unwrap();
    assert!(tree.resolve("", true).await.unwrap().is_none());
}

#[test(tokio::test)]
async fn exact_match_returns_page_untrimmed() {
    let (tree, ids) = sample_tree().await;
    let resolved = tree.resolve("a/b/c", true).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.c);
    assert_eq!(resolved.base_uri, "a/b/c");
    assert!(!resolved.is_trimmed_match("/a/b/c/"));

    let resolved = tree.resolve(&["a", "b"][..], false).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.b);
}

#[test(tokio::test)]
async fn live_request_trims_to_deepest_existing_ancestor() {
    let (tree, ids) = sample_tree().await;
    let resolved = tree
        .resolve("/a/b/c/extra/more", true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.page.id, ids.c);
    assert_eq!(resolved.base_uri, "a/b/c");
    assert!(resolved.is_trimmed_match("a/b/c/extra/more"));

    let resolved = tree.resolve("x/unknown", true).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.x);
    assert_eq!(resolved.base_uri, "x");
}

#[test(tokio::test)]
async fn internal_request_never_trims() {
    let (tree, _) = sample_tree().await;
    assert!(tree.resolve("a/b/c/extra", false).await.unwrap().is_none());
}

#[test(tokio::test)]
async fn unknown_first_segment_misses() {
    let (tree, _) = sample_tree().await;
    assert!(tree.resolve("nowhere/at/all", true).await.unwrap().is_none());
}

#[test(tokio::test)]
async fn strict_page_only_serves_its_own_path() {
    let (tree, ids) = sample_tree().await;
    let resolved = tree.resolve("a/strict", true).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.strict);
    assert!(tree.resolve("a/strict/deeper", true).await.unwrap().is_none());
    // Internal callers match exactly, so strictness never comes into play.
    assert!(tree.resolve("a/strict", false).await.unwrap().is_some());
}

#[test(tokio::test)]
async fn trimming_stops_after_configured_lookups() {
    let config = TreeConfig {
        max_trim_iterations: 2,
        ..Default::default()
    };
    let (tree, ids) = sample_tree_with(config).await;
    // a/b/c/d/e then a/b/c/d: two lookups, both miss.
    assert!(tree.resolve("a/b/c/d/e", true).await.unwrap().is_none());
    // a/b/c/d then a/b/c: found on the second lookup.
    let resolved = tree.resolve("a/b/c/d", true).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.c);
}

#[test(tokio::test)]
async fn default_trim_bound_is_fifteen_lookups() {
    let (tree, ids) = sample_tree().await;
    let deep = |extra: usize| {
        let mut segments = vec!["a".to_string()];
        segments.extend((0..extra).map(|idx| format!("s{idx}")));
        RequestPath::Segments(segments)
    };
    let resolved = tree.resolve(deep(14), true).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.a);
    assert!(tree.resolve(deep(15), true).await.unwrap().is_none());
}

#[test(tokio::test)]
async fn status_filter_applies_to_every_lookup() {
    let (tree, ids) = sample_tree().await;
    assert!(tree.resolve("a/draft", false).await.unwrap().is_none());
    // The draft page is invisible, so a live request keeps trimming past it.
    let resolved = tree.resolve("a/draft/post", true).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.a);

    let drafts = tree.resolver().with_status(Some(PageStatus::Draft));
    let resolved = drafts.resolve("a/draft", false).await.unwrap().unwrap();
    assert_eq!(resolved.page.id, ids.draft);
    assert!(drafts.resolve("a/b", false).await.unwrap().is_none());

    let any = tree.resolver().with_status(None);
    assert!(any.resolve("a/draft", false).await.unwrap().is_some());
    assert!(any.resolve("a/b", false).await.unwrap().is_some());
}
