//! Fetch error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for provider and host operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Operation timed out.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Extraction backend reported a failure.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Extraction succeeded but surfaced no URL worth validating.
    #[error("No usable URL in extraction result")]
    NoUsableUrl,

    /// Credentials could not be obtained.
    #[error("Credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    /// Invalid response from a backend.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Extraction backend could not be run or exited with a failure.
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid header name or value.
    #[error("Invalid header {0}")]
    InvalidHeader(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}

impl HttpError {
    /// Returns true if the error happened below HTTP (connect, DNS, TLS, timeout).
    pub fn is_network(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout => true,
            Self::InvalidUrl(_) | Self::InvalidHeader(_) => false,
        }
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command timed out.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit code.
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code from the process.
        code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
