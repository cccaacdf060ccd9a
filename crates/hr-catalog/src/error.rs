//! Catalog error types.

use thiserror::Error;

/// Errors raised while building or querying the intent catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("intent already registered: {0}")]
    DuplicateIntent(String),

    #[error("unknown intent: {0}")]
    UnknownIntent(String),

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Convenience alias for catalog results.
pub type CatalogResult<T> = Result<T, CatalogError>;
