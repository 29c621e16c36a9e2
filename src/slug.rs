//! Sibling slug uniqueness.

use std::collections::BTreeSet;

use crate::{
    error::PageError,
    paths::{child_lookup, validate_slug},
    properties::{Page, PageId},
    store::PageStore,
};

pub const ROOT_FOLDER: &str = "root";

pub struct SlugUniquenessGuard<'a, S> {
    store: &'a S,
}

impl<'a, S: PageStore> SlugUniquenessGuard<'a, S> {
    pub fn new(store: &'a S) -> Self {
        SlugUniquenessGuard { store }
    }

    /// True iff a page other than `exclude_id` already uses `slug` under `parent_id`. Pass
    /// [PageId::ROOT] as `exclude_id` for pages that do not exist yet.
    pub async fn is_duplicate(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<bool, PageError> {
        let count = self
            .store
            .count_siblings_with_slug(slug, parent_id, exclude_id)
            .await?;
        Ok(count > 0)
    }

    pub async fn is_slug_unique(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<bool, PageError> {
        Ok(!self.is_duplicate(slug, parent_id, exclude_id).await?)
    }

    /// Validate a slug for a create or rename, turning a collision into
    /// [PageError::DuplicateSlug] that names the path already taken and the parent it lives under.
    pub async fn check_slug(
        &self,
        slug: &str,
        parent_id: PageId,
        exclude_id: PageId,
    ) -> Result<(), PageError> {
        validate_slug(slug)?;
        if !self.is_duplicate(slug, parent_id, exclude_id).await? {
            return Ok(());
        }
        let (url, parent) = if parent_id.is_root() {
            (format!("/{slug}"), ROOT_FOLDER.to_string())
        } else {
            match self.store.get_by_id(parent_id).await? {
                Some(parent) => (
                    format!("/{}", child_lookup(Some(&parent.lookup), slug)),
                    parent_label(&parent),
                ),
                None => (format!("/{slug}"), parent_id.to_string()),
            }
        };
        tracing::debug!("Rejecting duplicate slug '{slug}' under {parent}");
        Err(PageError::DuplicateSlug {
            slug: slug.to_string(),
            url,
            parent,
        })
    }
}

fn parent_label(parent: &Page) -> String {
    if parent.title.is_empty() {
        parent.slug.clone()
    } else {
        parent.title.clone()
    }
}

/// The first slug used twice within one sibling group, if any.
pub(crate) fn first_duplicate(siblings: &[Page]) -> Option<&str> {
    let mut seen = BTreeSet::new();
    for page in siblings {
        if !seen.insert(page.slug.as_str()) {
            return Some(page.slug.as_str());
        }
    }
    None
}
