//! Error types for Zero Bill Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Zero Bill Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document store rejected or failed an upload
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Reasoning service could not be reached or is not configured
    #[error("Reasoning service unavailable: {0}")]
    ReasoningUnavailable(String),

    /// Reasoning service replied, but the payload could not be normalized
    /// into an analysis. Carries the raw text for diagnostics.
    #[error("Malformed analysis from reasoning service")]
    MalformedAnalysis { raw: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) => 404,
            Error::Upload(_) => 502,
            Error::ReasoningUnavailable(_) => 502,
            Error::MalformedAnalysis { .. } => 502,
            _ => 500,
        }
    }
}
