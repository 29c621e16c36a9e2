//! Request path normalization and the segment arithmetic shared by lookup building and
//! resolution.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::PageError;

pub const SEPARATOR: char = '/';

/// An inbound path as a router hands it over: absent, a raw string, or pre-split segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPath {
    #[default]
    Empty,
    Path(String),
    Segments(Vec<String>),
}

impl RequestPath {
    /// The normalized `a/b/c` form, or `None` when nothing but separators remain (the home page
    /// request).
    pub fn normalized(&self) -> Option<String> {
        let path = match self {
            RequestPath::Empty => return None,
            RequestPath::Path(path) => normalize_path(path),
            RequestPath::Segments(segments) => join_segments(segments),
        };
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    }
}

impl Display for RequestPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestPath::Empty => write!(f, "<home>"),
            RequestPath::Path(path) => write!(f, "{path}"),
            RequestPath::Segments(segments) => write!(f, "{}", segments.join("/")),
        }
    }
}

impl From<&str> for RequestPath {
    fn from(path: &str) -> Self {
        RequestPath::Path(path.to_string())
    }
}

impl From<String> for RequestPath {
    fn from(path: String) -> Self {
        RequestPath::Path(path)
    }
}

impl From<Option<&str>> for RequestPath {
    fn from(path: Option<&str>) -> Self {
        path.map(RequestPath::from).unwrap_or_default()
    }
}

impl From<Vec<String>> for RequestPath {
    fn from(segments: Vec<String>) -> Self {
        RequestPath::Segments(segments)
    }
}

impl From<&[&str]> for RequestPath {
    fn from(segments: &[&str]) -> Self {
        RequestPath::Segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// Trim leading and trailing separators and collapse empty segments: `"/a//b/"` -> `"a/b"`.
/// Segment contents are kept as given.
pub fn normalize_path(path: &str) -> String {
    path.split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<&str>>()
        .join("/")
}

/// Join segments into a normalized path. Segments may themselves contain separators.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    normalize_path(
        &segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<&str>>()
            .join("/"),
    )
}

/// Drop the last segment of a normalized path. `None` once a single segment remains.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|idx| &path[..idx])
}

/// The lookup of a page called `slug` under a parent whose lookup is `parent_lookup`.
pub fn child_lookup(parent_lookup: Option<&str>, slug: &str) -> String {
    match parent_lookup.filter(|lookup| !lookup.is_empty()) {
        Some(lookup) => format!("{lookup}/{slug}"),
        None => slug.to_string(),
    }
}

/// Slugs are non-empty runs of alphanumerics, `.`, `-` and `_`.
pub fn validate_slug(slug: &str) -> Result<(), PageError> {
    if slug.is_empty() {
        return Err(PageError::InvalidSlug("slug is empty".to_string()));
    }
    if let Some(c) = slug
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '.' | '-' | '_')))
    {
        return Err(PageError::InvalidSlug(format!(
            "'{slug}' contains the character {c:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/b/c/"), "a/b/c");
        assert_eq!(normalize_path("a//b"), "a/b");
        assert_eq!(normalize_path("///"), "");
        assert_eq!(normalize_path("about"), "about");
    }

    #[test]
    fn normalize_keeps_whitespace_inside_segments() {
        assert_eq!(normalize_path("a/ b"), "a/ b");
        assert_eq!(normalize_path("/a b/"), "a b");
        assert_eq!(
            RequestPath::from("blog/ 2024").normalized(),
            Some("blog/ 2024".to_string())
        );
    }

    #[test]
    fn test_request_path_forms() {
        assert_eq!(RequestPath::Empty.normalized(), None);
        assert_eq!(RequestPath::from("/").normalized(), None);
        assert_eq!(RequestPath::from(None).normalized(), None);
        assert_eq!(
            RequestPath::from(&["a", "b/", "c"][..]).normalized(),
            Some("a/b/c".to_string())
        );
        assert_eq!(
            RequestPath::from("/blog/2024/").normalized(),
            Some("blog/2024".to_string())
        );
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("a/b/c"), Some("a/b"));
        assert_eq!(parent_path("a/b"), Some("a"));
        assert_eq!(parent_path("a"), None);
    }

    #[test]
    fn test_child_lookup() {
        assert_eq!(child_lookup(None, "home"), "home");
        assert_eq!(child_lookup(Some(""), "home"), "home");
        assert_eq!(child_lookup(Some("a/b"), "c"), "a/b/c");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("release-notes_v1.2").is_ok());
        assert!(matches!(validate_slug(""), Err(PageError::InvalidSlug(_))));
        assert!(matches!(
            validate_slug("a/b"),
            Err(PageError::InvalidSlug(_))
        ));
        assert!(matches!(
            validate_slug("has space"),
            Err(PageError::InvalidSlug(_))
        ));
    }
}
