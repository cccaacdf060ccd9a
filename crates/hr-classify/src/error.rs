//! Classifier and configuration error types.

use thiserror::Error;

/// Failures of the language-model stage.
///
/// These never escape the ensemble: it logs them and carries on with the
/// rule result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// Backend unreachable, returned a non-success status, or timed out.
    #[error("language model unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend answered with something that is not a usable verdict.
    #[error("malformed language model response: {0}")]
    MalformedResponse(String),
}

/// Convenience alias for classifier results.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Rejected routing configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("weights must be non-negative with a positive sum (rule {rule}, llm {llm})")]
    InvalidWeights { rule: f64, llm: f64 },

    #[error("llm_timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}
