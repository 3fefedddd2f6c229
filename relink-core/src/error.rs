//! Core error types for `relink`.

use thiserror::Error;

/// Core error type for model construction and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A header required by a model invariant is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// A field carried an invalid value.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
