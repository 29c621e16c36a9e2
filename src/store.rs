//! The storage boundary. Tree maintenance and resolution only ever talk to a [PageStore].
//!
//! Reads return `None`/empty collections for absent rows rather than errors. All writes go through
//! [PageStore::commit], which must apply its batch atomically: either every event lands or none
//! does, and no reader observes a half-applied batch.

use std::{future::Future, sync::Arc};

use crate::{
    error::PageError,
    event::PageEvent,
    properties::{Page, PageId, PageStatus},
};

mod memory;

pub use memory::MemoryStore;

pub trait PageStore: Sync {
    fn get_by_id(
        &self,
        id: PageId,
    ) -> impl Future<Output = Result<Option<Page>, PageError>> + Send;

    /// The page whose stored lookup equals `path`, restricted to `status` when given. When several
    /// pages share a lookup (which a well-formed tree never produces) the lowest id wins.
    fn get_by_exact_path(
        &self,
        path: &str,
        status: Option<PageStatus>,
    ) -> impl Future<Output = Result<Option<Page>, PageError>> + Send;

    fn get_home(
        &self,
        status: Option<PageStatus>,
    ) -> impl Future<Output = Result<Option<Page>, PageError>> + Send;

    /// Direct children of `parent_id`, sorted by sibling order then id. Passing [PageId::ROOT]
    /// returns the root pages.
    fn get_children(
        &self,
        parent_id: PageId,
    ) -> impl Future<Output = Result<Vec<Page>, PageError>> + Send;

    /// Number of pages other than `exclude_id` under `parent_id` whose slug is `slug`.
    fn count_siblings_with_slug(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> impl Future<Output = Result<usize, PageError>> + Send;

    /// Apply a batch of events as one unit of work. Returns the ids assigned to
    /// [PageEvent::PageCreated] events, in batch order.
    fn commit(
        &self,
        events: Vec<PageEvent>,
    ) -> impl Future<Output = Result<Vec<PageId>, PageError>> + Send;

    fn update_lookup(
        &self,
        id: PageId,
        lookup: String,
    ) -> impl Future<Output = Result<(), PageError>> + Send {
        async move {
            self.commit(vec![PageEvent::LookupUpdated(id, lookup)])
                .await
                .map(|_| ())
        }
    }

    /// Clears every home flag and sets it on `id` in one commit.
    fn set_home_flag(&self, id: PageId) -> impl Future<Output = Result<(), PageError>> + Send {
        async move { self.commit(vec![PageEvent::HomeSet(id)]).await.map(|_| ()) }
    }
}

impl<S: PageStore + Send> PageStore for Arc<S> {
    async fn get_by_id(&self, id: PageId) -> Result<Option<Page>, PageError> {
        (**self).get_by_id(id).await
    }

    async fn get_by_exact_path(
        &self,
        path: &str,
        status: Option<PageStatus>,
    ) -> Result<Option<Page>, PageError> {
        (**self).get_by_exact_path(path, status).await
    }

    async fn get_home(&self, status: Option<PageStatus>) -> Result<Option<Page>, PageError> {
        (**self).get_home(status).await
    }

    async fn get_children(&self, parent_id: PageId) -> Result<Vec<Page>, PageError> {
        (**self).get_children(parent_id).await
    }

    async fn count_siblings_with_slug(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<usize, PageError> {
        (**self)
            .count_siblings_with_slug(slug, parent_id, exclude_id)
            .await
    }

    async fn commit(&self, events: Vec<PageEvent>) -> Result<Vec<PageId>, PageError> {
        (**self).commit(events).await
    }
}

/// Whether `page` passes an optional status filter.
pub(crate) fn status_matches(page: &Page, status: Option<PageStatus>) -> bool {
    status.map(|s| page.status == s).unwrap_or(true)
}
