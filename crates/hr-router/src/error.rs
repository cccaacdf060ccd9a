//! Router error types.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by registration or carried inside a `RouterResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouterError {
    /// Nothing can take the request and no fallback is set.
    #[error("no handler for intent {}", intent.as_deref().unwrap_or("<none>"))]
    NoHandler { intent: Option<String> },

    /// The name is already bound to a different handler object.
    #[error("handler name already registered: {name}")]
    DuplicateHandlerName { name: String },

    #[error("unknown handler: {name}")]
    UnknownHandler { name: String },

    /// The handler returned an error or panicked.
    #[error("handler {handler} failed: {detail}")]
    Handler { handler: String, detail: String },
}
