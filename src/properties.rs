//! Page records and the identifiers, statuses and inputs that describe them.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::PageError;

/// Store-assigned page identifier.
///
/// [PageId::ROOT] is never assigned to a page. It is the parent sentinel for top-level pages, so a
/// page whose `parent_id` is [PageId::ROOT] sits at the root of the tree.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl PageId {
    pub const ROOT: PageId = PageId(0);

    pub fn is_root(&self) -> bool {
        *self == PageId::ROOT
    }
}

impl Display for PageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageId {
    fn from(id: u64) -> Self {
        PageId(id)
    }
}

impl FromStr for PageId {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(PageId)
            .map_err(|e| PageError::Serialization(format!("Invalid page id '{s}': {e}")))
    }
}

/// Publication status of a page. Resolution is normally restricted to one status.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Live,
    Draft,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Live => "live",
            PageStatus::Draft => "draft",
        }
    }
}

impl Display for PageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageStatus {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(PageStatus::Live),
            "draft" => Ok(PageStatus::Draft),
            other => Err(PageError::Serialization(format!(
                "Unknown page status '{other}'"
            ))),
        }
    }
}

/// A node of the page tree.
///
/// `lookup` is derived state: it must always equal the `/`-joined slugs along the current
/// root-to-page chain. It is set at creation and rewritten by [crate::lookup] whenever that chain
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_id: PageId,
    #[serde(default)]
    pub lookup: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default)]
    pub strict_uri: bool,
    /// Opaque content attached to the page. Stored and returned, never interpreted.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Page {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_root()
    }
}

/// Input for [crate::tree::PageTree::create_page]. The store assigns the id and the tree computes the
/// lookup; `order` defaults to the end of the sibling list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPage {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_id: PageId,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default)]
    pub strict_uri: bool,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl NewPage {
    pub fn new<S: Into<String>>(slug: S, parent_id: PageId) -> Self {
        NewPage {
            slug: slug.into(),
            parent_id,
            ..Default::default()
        }
    }

    /// Materialize the page row a store inserts once it has picked an id.
    pub(crate) fn into_page(self, id: PageId, lookup: String, order: u32) -> Page {
        Page {
            id,
            slug: self.slug,
            title: self.title,
            parent_id: self.parent_id,
            lookup,
            order,
            status: self.status,
            is_home: self.is_home,
            strict_uri: self.strict_uri,
            payload: self.payload,
        }
    }
}

/// A page accepted by [crate::resolver::PathResolver], together with the literal, possibly
/// trimmed, request path that matched it. Breadcrumbs are built from `base_uri`, not from the
/// stored lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPage {
    pub page: Page,
    pub base_uri: String,
}

impl ResolvedPage {
    /// True when the match was found by dropping trailing segments of `request`.
    pub fn is_trimmed_match(&self, request: &str) -> bool {
        self.base_uri != crate::paths::normalize_path(request)
    }
}

/// One level of a nested sibling ordering, as produced by a drag-and-drop tree editor.
///
/// Every child is re-parented under `id` and gets its position in `children` as its order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReorderNode {
    pub id: PageId,
    #[serde(default)]
    pub children: Vec<ReorderNode>,
}

impl ReorderNode {
    pub fn leaf(id: PageId) -> Self {
        ReorderNode {
            id,
            children: Vec::new(),
        }
    }

    pub fn with_children(id: PageId, children: Vec<ReorderNode>) -> Self {
        ReorderNode { id, children }
    }
}
