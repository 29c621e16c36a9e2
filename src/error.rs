use std::io;

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "service")]
use sqlx::Error as SqlxError;

use serde_json::Error as JsonError;

use crate::properties::PageId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum PageError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("A page with the path '{url}' already exists under '{parent}'")]
    DuplicateSlug {
        slug: String,
        url: String,
        parent: String,
    },
    #[error("Inconsistent page tree at page {id}: {reason}")]
    InconsistentTree { id: PageId, reason: String },
    #[error("Invalid slug: {0}")]
    InvalidSlug(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Page store error: {0}")]
    Store(String),
}

impl PageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PageError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PageError::DuplicateSlug { .. } => StatusCode::CONFLICT,
            PageError::InconsistentTree { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PageError::InvalidSlug(_) => StatusCode::BAD_REQUEST,
            PageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PageError::NotFound(_) => StatusCode::NOT_FOUND,
            PageError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PageError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn inconsistent<S: Into<String>>(id: PageId, reason: S) -> PageError {
        PageError::InconsistentTree {
            id,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(id: PageId) -> PageError {
        PageError::NotFound(format!("page {id}"))
    }
}

impl From<toml::de::Error> for PageError {
    fn from(src: toml::de::Error) -> PageError {
        PageError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<JsonError> for PageError {
    fn from(src: JsonError) -> PageError {
        PageError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for PageError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => PageError::NotFound(format!("{x}")),
            _ => PageError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

#[cfg(feature = "service")]
impl From<SqlxError> for PageError {
    fn from(db_error: SqlxError) -> Self {
        match db_error {
            SqlxError::RowNotFound => PageError::NotFound("database row".to_string()),
            other => PageError::Store(format!("database error: {other:?}")),
        }
    }
}

#[cfg(feature = "service")]
impl From<sqlx::migrate::MigrateError> for PageError {
    fn from(migrate_error: sqlx::migrate::MigrateError) -> Self {
        PageError::Store(format!("database migration error: {migrate_error}"))
    }
}
