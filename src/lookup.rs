//! Materialized path ("lookup") maintenance.
//!
//! [LookupBuilder] computes one page's lookup by walking parent references up to the root.
//! [DescendantReindexer] recomputes a whole subtree: it enumerates the subtree in pre-order, derives
//! each child's lookup from its freshly computed parent, and persists every changed lookup in one
//! [PageStore::commit].
//!
//! Both read the tree through a `TreeView`, which can overlay pending moves and renames on top of
//! the stored rows. Structural operations use that to plan the new lookups for the tree shape they
//! are about to create, then commit the shape change and the lookups together.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    config::TreeConfig,
    error::PageError,
    event::PageEvent,
    paths::child_lookup,
    properties::{Page, PageId},
    store::PageStore,
};

/// Pending structural changes not yet committed to the store.
#[derive(Debug, Clone, Default)]
pub(crate) struct TreeOverlay {
    moves: BTreeMap<PageId, (PageId, u32)>,
    slugs: BTreeMap<PageId, String>,
}

impl TreeOverlay {
    pub(crate) fn from_events(events: &[PageEvent]) -> Self {
        let mut overlay = TreeOverlay::default();
        for event in events {
            match event {
                PageEvent::PageMoved(id, parent_id, order) => {
                    overlay.moves.insert(*id, (*parent_id, *order));
                }
                PageEvent::SlugChanged(id, slug) => {
                    overlay.slugs.insert(*id, slug.clone());
                }
                _ => {}
            }
        }
        overlay
    }

    fn patch(&self, mut page: Page) -> Page {
        if let Some((parent_id, order)) = self.moves.get(&page.id) {
            page.parent_id = *parent_id;
            page.order = *order;
        }
        if let Some(slug) = self.slugs.get(&page.id) {
            page.slug = slug.clone();
        }
        page
    }
}

/// Read access to the page tree as it will look once an overlay is committed.
pub(crate) struct TreeView<'a, S> {
    store: &'a S,
    overlay: TreeOverlay,
}

impl<'a, S: PageStore> TreeView<'a, S> {
    pub(crate) fn new(store: &'a S, overlay: TreeOverlay) -> Self {
        TreeView { store, overlay }
    }

    pub(crate) async fn page(&self, id: PageId) -> Result<Option<Page>, PageError> {
        Ok(self
            .store
            .get_by_id(id)
            .await?
            .map(|page| self.overlay.patch(page)))
    }

    pub(crate) async fn children(&self, parent_id: PageId) -> Result<Vec<Page>, PageError> {
        let mut children = self
            .store
            .get_children(parent_id)
            .await?
            .into_iter()
            .map(|page| self.overlay.patch(page))
            .filter(|page| page.parent_id == parent_id)
            .collect::<Vec<Page>>();
        for (id, (new_parent, _)) in self.overlay.moves.iter() {
            if *new_parent != parent_id || children.iter().any(|child| child.id == *id) {
                continue;
            }
            if let Some(page) = self.page(*id).await? {
                children.push(page);
            }
        }
        children.sort_by_key(|page| (page.order, page.id));
        Ok(children)
    }
}

/// Computes the lookup of a single page by walking to the root.
pub struct LookupBuilder<'a, S> {
    view: TreeView<'a, S>,
    max_depth: usize,
}

impl<'a, S: PageStore> LookupBuilder<'a, S> {
    pub fn new(store: &'a S, config: &TreeConfig) -> Self {
        LookupBuilder::staged(store, config, TreeOverlay::default())
    }

    pub(crate) fn staged(store: &'a S, config: &TreeConfig, overlay: TreeOverlay) -> Self {
        LookupBuilder {
            view: TreeView::new(store, overlay),
            max_depth: config.max_depth,
        }
    }

    /// Root-first slugs from the tree root down to `id`.
    ///
    /// Fails with [PageError::InconsistentTree] on a cycle, a chain longer than the configured
    /// `max_depth`, or a parent reference to a page that does not exist.
    async fn walk_segments(&self, id: PageId) -> Result<Vec<String>, PageError> {
        let mut page = self.view.page(id).await?.ok_or_else(|| PageError::missing(id))?;
        let mut segments = Vec::new();
        let mut visited = BTreeSet::new();
        loop {
            if !visited.insert(page.id) {
                tracing::warn!("Parent chain of page {id} loops back to page {}", page.id);
                return Err(PageError::inconsistent(
                    id,
                    format!("parent chain loops back to page {}", page.id),
                ));
            }
            segments.push(page.slug.clone());
            if segments.len() > self.max_depth {
                tracing::warn!("Parent chain of page {id} exceeds {} levels", self.max_depth);
                return Err(PageError::inconsistent(
                    id,
                    format!("parent chain deeper than {} levels", self.max_depth),
                ));
            }
            if page.parent_id.is_root() {
                break;
            }
            let parent_id = page.parent_id;
            page = self.view.page(parent_id).await?.ok_or_else(|| {
                PageError::inconsistent(id, format!("ancestor {parent_id} does not exist"))
            })?;
        }
        segments.reverse();
        Ok(segments)
    }

    /// The lookup `id` should have given the current tree shape. Does not write.
    pub async fn build_lookup(&self, id: PageId) -> Result<String, PageError> {
        let lookup = self.walk_segments(id).await?.join("/");
        tracing::debug!("Built lookup for page {id}: '{lookup}'");
        Ok(lookup)
    }

    /// The lookup a page named `slug` would have as a child of `parent_id`.
    pub async fn lookup_under(&self, parent_id: PageId, slug: &str) -> Result<String, PageError> {
        if parent_id.is_root() {
            return Ok(slug.to_string());
        }
        let segments = self.walk_segments(parent_id).await?;
        if segments.len() + 1 > self.max_depth {
            return Err(PageError::inconsistent(
                parent_id,
                format!("a child would be deeper than {} levels", self.max_depth),
            ));
        }
        Ok(child_lookup(Some(&segments.join("/")), slug))
    }

    /// Recompute and persist the lookup of `id`. Only that page is written; its ancestors are
    /// assumed to be correct already.
    pub async fn rebuild(&self, id: PageId) -> Result<String, PageError> {
        let lookup = self.build_lookup(id).await?;
        self.view.store.update_lookup(id, lookup.clone()).await?;
        Ok(lookup)
    }
}

/// Outcome of a subtree or whole-tree reindex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexSummary {
    /// Every page visited, in pre-order per subtree.
    pub ids: Vec<PageId>,
    /// Number of lookups that changed and were written.
    pub updated: usize,
}

/// Recomputes lookups for a page and everything below it.
pub struct DescendantReindexer<'a, S> {
    builder: LookupBuilder<'a, S>,
}

impl<'a, S: PageStore> DescendantReindexer<'a, S> {
    pub fn new(store: &'a S, config: &TreeConfig) -> Self {
        DescendantReindexer {
            builder: LookupBuilder::new(store, config),
        }
    }

    pub(crate) fn staged(store: &'a S, config: &TreeConfig, overlay: TreeOverlay) -> Self {
        DescendantReindexer {
            builder: LookupBuilder::staged(store, config, overlay),
        }
    }

    fn view(&self) -> &TreeView<'a, S> {
        &self.builder.view
    }

    /// The subtree rooted at `id`, in pre-order, children in sibling order.
    async fn collect_subtree(&self, id: PageId) -> Result<Vec<Page>, PageError> {
        let root = self.view().page(id).await?.ok_or_else(|| PageError::missing(id))?;
        let mut visited = BTreeSet::from([root.id]);
        let mut stack = vec![root];
        let mut subtree = Vec::new();
        while let Some(page) = stack.pop() {
            let children = self.view().children(page.id).await?;
            for child in children.into_iter().rev() {
                if !visited.insert(child.id) {
                    return Err(PageError::inconsistent(
                        id,
                        format!("page {} is reachable twice below {id}", child.id),
                    ));
                }
                stack.push(child);
            }
            subtree.push(page);
        }
        Ok(subtree)
    }

    /// Every id in the subtree rooted at `id`, starting with `id` itself, parents before
    /// children.
    pub async fn collect_descendant_ids(&self, id: PageId) -> Result<Vec<PageId>, PageError> {
        Ok(self
            .collect_subtree(id)
            .await?
            .into_iter()
            .map(|page| page.id)
            .collect())
    }

    /// Compute the lookup of every page in the subtree without writing anything. Returns the
    /// visited ids and a [PageEvent::LookupUpdated] for each lookup that differs from the stored
    /// one.
    pub async fn plan_subtree(
        &self,
        id: PageId,
    ) -> Result<(Vec<PageId>, Vec<PageEvent>), PageError> {
        let subtree = self.collect_subtree(id).await?;
        let root_segments = self.builder.walk_segments(id).await?;

        // page -> (lookup, depth)
        let mut computed: BTreeMap<PageId, (String, usize)> = BTreeMap::new();
        computed.insert(id, (root_segments.join("/"), root_segments.len()));

        let mut events = Vec::new();
        for page in subtree.iter() {
            if page.id != id {
                let (parent_lookup, parent_depth) =
                    computed.get(&page.parent_id).cloned().ok_or_else(|| {
                        PageError::inconsistent(
                            page.id,
                            format!("parent {} was not visited before its child", page.parent_id),
                        )
                    })?;
                if parent_depth + 1 > self.builder.max_depth {
                    return Err(PageError::inconsistent(
                        page.id,
                        format!("subtree deeper than {} levels", self.builder.max_depth),
                    ));
                }
                computed.insert(
                    page.id,
                    (child_lookup(Some(&parent_lookup), &page.slug), parent_depth + 1),
                );
            }
            let lookup = &computed[&page.id].0;
            if *lookup != page.lookup {
                events.push(PageEvent::LookupUpdated(page.id, lookup.clone()));
            }
        }
        Ok((subtree.into_iter().map(|page| page.id).collect(), events))
    }

    /// Plan the whole-tree rebuild: every root page's lookup is reset to its slug, then each of
    /// `root_ids` is reindexed as a subtree.
    pub async fn plan_whole_tree(
        &self,
        root_ids: &[PageId],
    ) -> Result<(Vec<PageId>, Vec<PageEvent>), PageError> {
        let mut planned: BTreeMap<PageId, String> = BTreeMap::new();
        let mut ids = Vec::new();
        let mut events = Vec::new();
        for root in self.view().children(PageId::ROOT).await? {
            if root.lookup != root.slug {
                planned.insert(root.id, root.slug.clone());
                events.push(PageEvent::LookupUpdated(root.id, root.slug));
            }
        }
        for root_id in root_ids {
            let (subtree_ids, subtree_events) = self.plan_subtree(*root_id).await?;
            ids.extend(subtree_ids);
            for event in subtree_events {
                if let PageEvent::LookupUpdated(id, lookup) = &event {
                    if planned.get(id) == Some(lookup) {
                        continue;
                    }
                    planned.insert(*id, lookup.clone());
                }
                events.push(event);
            }
        }
        Ok((ids, events))
    }

    /// Recompute and persist lookups for the subtree rooted at `id` as one unit of work.
    pub async fn reindex(&self, id: PageId) -> Result<ReindexSummary, PageError> {
        let (ids, events) = self.plan_subtree(id).await?;
        self.commit(ids, events).await
    }

    pub async fn reindex_whole_tree(
        &self,
        root_ids: &[PageId],
    ) -> Result<ReindexSummary, PageError> {
        let (ids, events) = self.plan_whole_tree(root_ids).await?;
        self.commit(ids, events).await
    }

    async fn commit(
        &self,
        ids: Vec<PageId>,
        events: Vec<PageEvent>,
    ) -> Result<ReindexSummary, PageError> {
        let updated = events.len();
        if !events.is_empty() {
            self.view().store.commit(events).await?;
        }
        tracing::info!("Reindexed {} pages, {updated} lookups changed", ids.len());
        Ok(ReindexSummary { ids, updated })
    }
}
