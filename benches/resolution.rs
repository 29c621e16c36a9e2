//! Performance benchmarks for path resolution and lookup maintenance
//!
//! Measures:
//! - Exact and trimmed resolution against a wide, deep in-memory tree
//! - Subtree reindexing after a move
//! - Whole-tree lookup rebuilds
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use pagetree::{
    config::TreeConfig,
    properties::{NewPage, PageId},
    store::MemoryStore,
    tree::PageTree,
};

const SECTIONS: usize = 20;
const ARTICLES: usize = 25;

// Two-level site: SECTIONS root pages, each with ARTICLES children, each with one "notes" page.
fn build_site(rt: &tokio::runtime::Runtime) -> (PageTree<MemoryStore>, Vec<PageId>) {
    rt.block_on(async {
        let tree = PageTree::new(MemoryStore::new(), TreeConfig::default());
        let mut sections = Vec::new();
        for section in 0..SECTIONS {
            let parent = tree
                .create_page(NewPage::new(format!("section-{section}"), PageId::ROOT))
                .await
                .unwrap();
            for article in 0..ARTICLES {
                let page = tree
                    .create_page(NewPage::new(format!("article-{article}"), parent.id))
                    .await
                    .unwrap();
                tree.create_page(NewPage::new("notes", page.id)).await.unwrap();
            }
            sections.push(parent.id);
        }
        (tree, sections)
    })
}

fn bench_exact_resolution(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (tree, _) = build_site(&rt);

    c.bench_function("exact_resolution", |b| {
        b.to_async(&rt).iter(|| async {
            tree.resolve("section-7/article-12/notes", false)
                .await
                .unwrap()
                .is_some()
        });
    });
}

fn bench_trimmed_resolution(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (tree, _) = build_site(&rt);

    c.bench_function("trimmed_resolution", |b| {
        b.to_async(&rt).iter(|| async {
            tree.resolve("section-7/article-12/notes/a/b/c/d/e/f/g/h/i", true)
                .await
                .unwrap()
                .is_some()
        });
    });
}

fn bench_move_and_reindex(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (tree, sections) = build_site(&rt);

    let tree = &tree;
    let (section, target) = (sections[0], sections[1]);

    c.bench_function("move_section_subtree", |b| {
        let mut round = 0usize;
        b.to_async(&rt).iter(move || {
            round += 1;
            // Alternate section-0 between the root and section-1.
            let parent = if round % 2 == 0 { PageId::ROOT } else { target };
            async move { tree.move_page(section, parent, None).await.unwrap().updated }
        });
    });
}

fn bench_whole_tree_rebuild(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (tree, _) = build_site(&rt);

    c.bench_function("whole_tree_rebuild", |b| {
        b.to_async(&rt)
            .iter(|| async { tree.rebuild_all().await.unwrap().ids.len() });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets =
        bench_exact_resolution,
        bench_trimmed_resolution,
        bench_move_and_reindex,
        bench_whole_tree_rebuild
}

criterion_main!(benches);
