use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::properties::{NewPage, PageId};

/// A single staged change to the page table.
///
/// Tree operations never write rows directly. They compute a `Vec<PageEvent>` from snapshots and
/// hand it to [crate::store::PageStore::commit], which applies the whole batch or none of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageEvent {
    /// Insert a new page with its precomputed lookup and sibling order. If the page is flagged
    /// home, every other home flag is cleared in the same commit.
    PageCreated(NewPage, String, u32),
    /// Page, new lookup
    LookupUpdated(PageId, String),
    /// Page, new parent, new sibling order
    PageMoved(PageId, PageId, u32),
    /// Page, new slug
    SlugChanged(PageId, String),
    /// Clears the home flag on every page, then sets it on this one.
    HomeSet(PageId),
    PagesRemoved(Vec<PageId>),
}

impl Display for PageEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PageEvent::PageCreated(page, lookup, order) => write!(
                f,
                "PageCreated({} under {} at {order}: '{lookup}')",
                page.slug, page.parent_id
            ),
            PageEvent::LookupUpdated(id, lookup) => write!(f, "LookupUpdated({id}: '{lookup}')"),
            PageEvent::PageMoved(id, parent, order) => {
                write!(f, "PageMoved({id} -> {parent} at {order})")
            }
            PageEvent::SlugChanged(id, slug) => write!(f, "SlugChanged({id}: '{slug}')"),
            PageEvent::HomeSet(id) => write!(f, "HomeSet({id})"),
            PageEvent::PagesRemoved(ids) => write!(
                f,
                "PagesRemoved({})",
                ids.iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
        }
    }
}
