//! Error handling for the completions core
//!
//! This module provides the idiomatic error taxonomy used across the KPI
//! aggregator, the copilot, and the import/export services.

use thiserror::Error;

/// Main error type for the completions core
#[derive(Error, Debug)]
pub enum CompletionsError {
    /// A required id or payload field is absent or unusable.
    #[error("missing or invalid parameter: {0}")]
    InvalidParameter(String),

    /// The data store signalled an error. Propagated verbatim, never retried.
    #[error("data store error: {0}")]
    Database(anyhow::Error),

    /// The chat-completion provider returned a non-success response.
    /// Fatal for the question at hand; there is no retry and no fallback.
    #[error("AI provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Transport-level failure talking to an external collaborator.
    #[error("request to external service failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth collaborator rejected the session token.
    #[error("no autorizado")]
    Unauthorized,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<anyhow::Error> for CompletionsError {
    fn from(err: anyhow::Error) -> Self {
        CompletionsError::Database(err)
    }
}

/// Result type alias for convenience
pub type CompletionsResult<T> = Result<T, CompletionsError>;
