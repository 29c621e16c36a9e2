//! # pagetree
//!
//! Hierarchical page addressing for content sites: resolve an inbound request path to the page
//! that should serve it, and keep every page's materialized path correct as the tree changes.
//!
//! ## Overview
//!
//! Pages form a forest. Each page stores a slug, a parent reference and a **lookup**: the
//! slash-joined slugs from the tree root down to the page (`a/b/c`). Resolution never walks the
//! tree; it matches the request against stored lookups. The cost of that is maintenance: whenever a
//! page moves or is renamed, every lookup in its subtree has to be recomputed.
//!
//! ### Key Features
//!
//! - **Progressive trimming**: a live request for `blog/2024/post` falls back to the nearest
//!   ancestor path that exists, unless that page opted into strict matching
//! - **Atomic structural edits**: moves, renames and reorders commit the shape change and every
//!   recomputed lookup in one batch
//! - **Sibling slug uniqueness**: duplicate slugs are rejected with the path already taken
//! - **Pluggable storage**: an in-memory store, and an SQLite store behind the `service` feature
//!
//! ## Architecture
//!
//! - **[`store`]**: the [`store::PageStore`] boundary and [`store::MemoryStore`]
//! - **[`resolver`]**: request-time [`resolver::PathResolver`]
//! - **[`lookup`]**: [`lookup::LookupBuilder`] and [`lookup::DescendantReindexer`]
//! - **[`slug`]**: [`slug::SlugUniquenessGuard`]
//! - **[`tree`]**: the [`tree::PageTree`] facade tying the above together
//! - **[`event`]**: the write vocabulary committed to a store
//! - **[`config`]**: [`config::TreeConfig`] and TOML page fixtures
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagetree::{
//!     config::TreeConfig,
//!     properties::{NewPage, PageId},
//!     store::MemoryStore,
//!     tree::PageTree,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tree = PageTree::new(MemoryStore::new(), TreeConfig::default());
//!     let blog = tree.create_page(NewPage::new("blog", PageId::ROOT)).await?;
//!     tree.create_page(NewPage::new("2024", blog.id)).await?;
//!
//!     // Nothing lives at blog/2024/post, so a live request is served by blog/2024.
//!     let resolved = tree.resolve("blog/2024/post", true).await?;
//!     assert_eq!(resolved.map(|r| r.base_uri), Some("blog/2024".to_string()));
//!
//!     // Renaming reindexes the subtree in the same commit.
//!     tree.rename_page(blog.id, "news").await?;
//!     assert!(tree.resolve("news/2024", false).await?.is_some());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: in-memory store, resolution and tree maintenance
//! - **service**: SQLite-backed store (`sqlx`)
//! - **bin**: the `pagetree` command line tool

pub mod config;
#[cfg(feature = "service")]
pub mod db;
pub mod error;
pub mod event;
pub mod lookup;
pub mod paths;
pub mod properties;
pub mod resolver;
pub mod slug;
pub mod store;
#[cfg(test)]
mod tests;
pub mod tree;

pub use error::*;
