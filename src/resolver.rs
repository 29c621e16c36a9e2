//! Request-time resolution of paths to pages.
//!
//! Resolution is a bounded search over a shrinking window of path segments:
//!
//! 1. An empty request resolves to the home page.
//! 2. Otherwise the normalized path is matched exactly against stored lookups.
//! 3. For live requests only, a miss drops the last segment and retries, so `blog/2024/some-post`
//!    can be served by the page at `blog` when nothing more specific exists. The number of
//!    lookups is capped by [TreeConfig::max_trim_iterations].
//! 4. A page flagged `strict_uri` is never served for a path longer than its own.
//!
//! Every outcome other than a storage failure is `Ok`: a miss is `Ok(None)`. Resolution only
//! reads, so dropping the future between lookups is always safe.

use crate::{
    config::TreeConfig,
    error::PageError,
    paths::{parent_path, RequestPath},
    properties::{PageStatus, ResolvedPage},
    store::PageStore,
};

pub struct PathResolver<'a, S> {
    store: &'a S,
    status: Option<PageStatus>,
    max_trim_iterations: usize,
}

impl<'a, S: PageStore> PathResolver<'a, S> {
    pub fn new(store: &'a S, config: &TreeConfig) -> Self {
        PathResolver {
            store,
            status: config.resolve_status,
            max_trim_iterations: config.max_trim_iterations,
        }
    }

    /// Restrict resolution to pages with `status`, or to any status with `None`.
    pub fn with_status(mut self, status: Option<PageStatus>) -> Self {
        self.status = status;
        self
    }

    /// Find the page serving `request`.
    ///
    /// `is_live_request` distinguishes an actual inbound request, which may be answered by an
    /// ancestor path, from internal callers that must match the exact path.
    pub async fn resolve<R: Into<RequestPath>>(
        &self,
        request: R,
        is_live_request: bool,
    ) -> Result<Option<ResolvedPage>, PageError> {
        let request = request.into();
        let Some(original) = request.normalized() else {
            let home = self.store.get_home(self.status).await?;
            if home.is_none() {
                tracing::debug!("No home page with status {:?}", self.status);
            }
            return Ok(home.map(|page| ResolvedPage {
                page,
                base_uri: String::new(),
            }));
        };

        let mut uri = original.as_str();
        let mut attempts = 0;
        let found = loop {
            attempts += 1;
            if let Some(page) = self.store.get_by_exact_path(uri, self.status).await? {
                break Some(page);
            }
            if !is_live_request || attempts >= self.max_trim_iterations {
                break None;
            }
            match parent_path(uri) {
                Some(parent) => {
                    tracing::debug!("No page at '{uri}', trying '{parent}'");
                    uri = parent;
                }
                None => break None,
            }
        };

        let Some(page) = found else {
            tracing::debug!("'{original}' did not resolve after {attempts} lookups");
            return Ok(None);
        };

        if is_live_request && page.strict_uri && uri != original {
            tracing::debug!(
                "Page {} at '{uri}' is strict, refusing to serve '{original}'",
                page.id
            );
            return Ok(None);
        }

        Ok(Some(ResolvedPage {
            page,
            base_uri: uri.to_string(),
        }))
    }
}
