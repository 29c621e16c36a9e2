//! [PageTree]: the operations a router or admin surface calls.
//!
//! Read operations go straight to the resolver or the store. Every structural operation follows
//! the same shape: validate, stage the shape change as [PageEvent]s, plan the resulting lookups
//! against a view with those events overlaid, then commit shape and lookups together.
//!
//! Writers through one [PageTree] are serialized: each structural operation holds the tree's write
//! lock from its first read to its commit, so validation and planning never see a tree another
//! writer is halfway through changing. Readers never take the lock. Stores additionally refuse any
//! commit that would leave a parent loop, which covers writers using separate [PageTree]s over one
//! store.

use std::collections::BTreeSet;
use tokio::sync::Mutex;

use crate::{
    config::TreeConfig,
    error::PageError,
    event::PageEvent,
    lookup::{DescendantReindexer, LookupBuilder, ReindexSummary, TreeOverlay, TreeView},
    paths::RequestPath,
    properties::{NewPage, Page, PageId, PageStatus, ReorderNode, ResolvedPage},
    resolver::PathResolver,
    slug::{first_duplicate, SlugUniquenessGuard, ROOT_FOLDER},
    store::{status_matches, PageStore},
};

pub struct PageTree<S> {
    store: S,
    config: TreeConfig,
    writes: Mutex<()>,
}

impl<S: PageStore> PageTree<S> {
    pub fn new(store: S, config: TreeConfig) -> Self {
        PageTree {
            store,
            config,
            writes: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn resolver(&self) -> PathResolver<'_, S> {
        PathResolver::new(&self.store, &self.config)
    }

    fn lookups(&self) -> LookupBuilder<'_, S> {
        LookupBuilder::new(&self.store, &self.config)
    }

    fn reindexer(&self) -> DescendantReindexer<'_, S> {
        DescendantReindexer::new(&self.store, &self.config)
    }

    fn guard(&self) -> SlugUniquenessGuard<'_, S> {
        SlugUniquenessGuard::new(&self.store)
    }

    async fn require(&self, id: PageId) -> Result<Page, PageError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| PageError::missing(id))
    }

    async fn next_order(&self, parent_id: PageId) -> Result<u32, PageError> {
        Ok(self
            .store
            .get_children(parent_id)
            .await?
            .iter()
            .map(|page| page.order + 1)
            .max()
            .unwrap_or(0))
    }

    /// Plan lookups for the subtree at `id` under the staged shape change and commit both.
    async fn commit_with_reindex(
        &self,
        id: PageId,
        mut events: Vec<PageEvent>,
    ) -> Result<ReindexSummary, PageError> {
        let overlay = TreeOverlay::from_events(&events);
        let (ids, lookup_events) = DescendantReindexer::staged(&self.store, &self.config, overlay)
            .plan_subtree(id)
            .await?;
        let updated = lookup_events.len();
        events.extend(lookup_events);
        self.store.commit(events).await?;
        Ok(ReindexSummary { ids, updated })
    }

    pub async fn resolve<R: Into<RequestPath>>(
        &self,
        request: R,
        is_live_request: bool,
    ) -> Result<Option<ResolvedPage>, PageError> {
        self.resolver().resolve(request, is_live_request).await
    }

    pub async fn rebuild_lookup(&self, id: PageId) -> Result<String, PageError> {
        let _writing = self.writes.lock().await;
        self.lookups().rebuild(id).await
    }

    pub async fn reindex_subtree(&self, id: PageId) -> Result<ReindexSummary, PageError> {
        let _writing = self.writes.lock().await;
        self.reindexer().reindex(id).await
    }

    pub async fn reindex_whole_tree(
        &self,
        root_ids: &[PageId],
    ) -> Result<ReindexSummary, PageError> {
        let _writing = self.writes.lock().await;
        self.reindexer().reindex_whole_tree(root_ids).await
    }

    /// Rebuild every lookup in the store, starting from its current root pages.
    pub async fn rebuild_all(&self) -> Result<ReindexSummary, PageError> {
        let _writing = self.writes.lock().await;
        let roots = self
            .store
            .get_children(PageId::ROOT)
            .await?
            .iter()
            .map(|page| page.id)
            .collect::<Vec<PageId>>();
        self.reindexer().reindex_whole_tree(&roots).await
    }

    pub async fn is_slug_unique(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<bool, PageError> {
        self.guard()
            .is_slug_unique(slug, parent_id, exclude_id)
            .await
    }

    pub async fn collect_descendant_ids(&self, id: PageId) -> Result<Vec<PageId>, PageError> {
        self.reindexer().collect_descendant_ids(id).await
    }

    pub async fn has_children(&self, id: PageId) -> Result<bool, PageError> {
        Ok(!self.store.get_children(id).await?.is_empty())
    }

    pub async fn find_by_id_and_status(
        &self,
        id: PageId,
        status: PageStatus,
    ) -> Result<Option<Page>, PageError> {
        Ok(self
            .store
            .get_by_id(id)
            .await?
            .filter(|page| status_matches(page, Some(status))))
    }

    pub async fn find_children_by_status(
        &self,
        parent_id: PageId,
        status: PageStatus,
    ) -> Result<Vec<Page>, PageError> {
        Ok(self
            .store
            .get_children(parent_id)
            .await?
            .into_iter()
            .filter(|page| status_matches(page, Some(status)))
            .collect())
    }

    /// Insert a page with its lookup already computed. Claiming the home flag clears it
    /// everywhere else in the same commit.
    pub async fn create_page(&self, new_page: NewPage) -> Result<Page, PageError> {
        let _writing = self.writes.lock().await;
        self.guard()
            .check_slug(&new_page.slug, new_page.parent_id, PageId::ROOT)
            .await?;
        if !new_page.parent_id.is_root() {
            self.require(new_page.parent_id).await?;
        }
        let lookup = self
            .lookups()
            .lookup_under(new_page.parent_id, &new_page.slug)
            .await?;
        let order = match new_page.order {
            Some(order) => order,
            None => self.next_order(new_page.parent_id).await?,
        };

        let created = self
            .store
            .commit(vec![PageEvent::PageCreated(new_page, lookup, order)])
            .await?;
        let id = created
            .first()
            .copied()
            .ok_or_else(|| PageError::Store("store did not report the created page".into()))?;
        let page = self.require(id).await?;
        tracing::info!("Created page {} at '{}'", page.id, page.lookup);
        Ok(page)
    }

    /// Re-parent `id` (and its subtree) under `new_parent`. Without an explicit `order` the page
    /// keeps its position when staying under the same parent and goes last otherwise.
    pub async fn move_page(
        &self,
        id: PageId,
        new_parent: PageId,
        order: Option<u32>,
    ) -> Result<ReindexSummary, PageError> {
        let _writing = self.writes.lock().await;
        let page = self.require(id).await?;
        if !new_parent.is_root() {
            self.require(new_parent).await?;
            if self.collect_descendant_ids(id).await?.contains(&new_parent) {
                return Err(PageError::inconsistent(
                    id,
                    format!("cannot move page under its own descendant {new_parent}"),
                ));
            }
        }
        self.guard().check_slug(&page.slug, new_parent, id).await?;
        let order = match order {
            Some(order) => order,
            None if page.parent_id == new_parent => page.order,
            None => self.next_order(new_parent).await?,
        };

        let summary = self
            .commit_with_reindex(id, vec![PageEvent::PageMoved(id, new_parent, order)])
            .await?;
        tracing::info!(
            "Moved page {id} under {new_parent}, {} lookups changed",
            summary.updated
        );
        Ok(summary)
    }

    /// Change the slug of `id` and reindex its subtree.
    pub async fn rename_page(&self, id: PageId, slug: &str) -> Result<ReindexSummary, PageError> {
        let _writing = self.writes.lock().await;
        let page = self.require(id).await?;
        self.guard().check_slug(slug, page.parent_id, id).await?;
        let summary = self
            .commit_with_reindex(id, vec![PageEvent::SlugChanged(id, slug.to_string())])
            .await?;
        tracing::info!("Renamed page {id} to '{slug}'");
        Ok(summary)
    }

    /// Apply a nested sibling ordering below `parent_id`: each node is placed under its parent in
    /// the nesting at the position it is listed in, and every affected subtree is reindexed, all
    /// in one commit.
    pub async fn reorder(
        &self,
        parent_id: PageId,
        nodes: &[ReorderNode],
    ) -> Result<ReindexSummary, PageError> {
        let _writing = self.writes.lock().await;
        if !parent_id.is_root() {
            self.require(parent_id).await?;
        }

        let mut events = Vec::new();
        let mut seen = BTreeSet::new();
        let mut parents = vec![parent_id];
        let mut stack = vec![(parent_id, nodes)];
        while let Some((parent, level)) = stack.pop() {
            for (position, node) in level.iter().enumerate() {
                if !seen.insert(node.id) || node.id == parent_id {
                    return Err(PageError::inconsistent(
                        node.id,
                        "page listed more than once in the ordering",
                    ));
                }
                self.require(node.id).await?;
                let order = u32::try_from(position).map_err(|_| {
                    PageError::inconsistent(parent, "too many siblings to order")
                })?;
                events.push(PageEvent::PageMoved(node.id, parent, order));
                if !node.children.is_empty() {
                    parents.push(node.id);
                    stack.push((node.id, node.children.as_slice()));
                }
            }
        }

        let overlay = TreeOverlay::from_events(&events);
        let view = TreeView::new(&self.store, overlay.clone());
        for parent in parents.iter() {
            let siblings = view.children(*parent).await?;
            if let Some(slug) = first_duplicate(&siblings) {
                let url = LookupBuilder::staged(&self.store, &self.config, overlay.clone())
                    .lookup_under(*parent, slug)
                    .await?;
                let label = match view.page(*parent).await? {
                    Some(page) if !page.title.is_empty() => page.title,
                    Some(page) => page.slug,
                    None => ROOT_FOLDER.to_string(),
                };
                return Err(PageError::DuplicateSlug {
                    slug: slug.to_string(),
                    url: format!("/{url}"),
                    parent: label,
                });
            }
        }

        let reindexer = DescendantReindexer::staged(&self.store, &self.config, overlay);
        let mut summary = ReindexSummary::default();
        for node in nodes.iter() {
            let (ids, lookup_events) = reindexer.plan_subtree(node.id).await?;
            summary.ids.extend(ids);
            summary.updated += lookup_events.len();
            events.extend(lookup_events);
        }
        self.store.commit(events).await?;
        tracing::info!(
            "Reordered {} pages below {parent_id}, {} lookups changed",
            seen.len(),
            summary.updated
        );
        Ok(summary)
    }

    /// Make `id` the only home page.
    pub async fn set_home_page(&self, id: PageId) -> Result<(), PageError> {
        let _writing = self.writes.lock().await;
        self.require(id).await?;
        self.store.set_home_flag(id).await?;
        tracing::info!("Page {id} is now the home page");
        Ok(())
    }

    /// Delete `id` and every page below it. Returns the removed ids in pre-order.
    pub async fn delete_page(&self, id: PageId) -> Result<Vec<PageId>, PageError> {
        let _writing = self.writes.lock().await;
        let ids = self.collect_descendant_ids(id).await?;
        self.store
            .commit(vec![PageEvent::PagesRemoved(ids.clone())])
            .await?;
        tracing::info!("Deleted page {id} and {} descendants", ids.len() - 1);
        Ok(ids)
    }
}
