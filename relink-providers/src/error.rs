//! Provider-specific errors.

use relink_fetch::{FetchError, ProcessError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the concrete extraction and credential providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Backend binary is not installed.
    #[error("{0} not found on PATH")]
    BackendNotFound(String),

    /// Backend exited with a failure.
    #[error("{backend} exited with code {code}: {message}")]
    BackendFailed {
        /// Backend command name.
        backend: String,
        /// Exit code.
        code: i32,
        /// Last meaningful stderr line.
        message: String,
    },

    /// Backend did not finish in time.
    #[error("{backend} timed out after {timeout:?}")]
    Timeout {
        /// Backend command name.
        backend: String,
        /// Configured timeout.
        timeout: Duration,
    },

    /// Backend output could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Backend output parsed but carried no stream.
    #[error("No streams in backend output")]
    NoStreams,

    /// Credential file could not be read.
    #[error("Credential file error: {0}")]
    Credentials(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
}

impl ProviderError {
    /// Maps a process failure for the named backend.
    pub fn from_process(backend: &str, error: ProcessError) -> Self {
        match error {
            ProcessError::NotFound(_) => Self::BackendNotFound(backend.to_string()),
            ProcessError::Timeout(timeout) => Self::Timeout {
                backend: backend.to_string(),
                timeout,
            },
            ProcessError::NonZeroExit { code, stderr } => Self::BackendFailed {
                backend: backend.to_string(),
                code,
                message: stderr,
            },
            ProcessError::Io(e) => Self::IoError(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        ProviderError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::ParseError(e.to_string())
    }
}

impl From<ProviderError> for FetchError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Timeout { timeout, .. } => FetchError::Timeout(timeout),
            ProviderError::ParseError(msg) => FetchError::InvalidResponse(msg),
            ProviderError::NoStreams => FetchError::NoUsableUrl,
            ProviderError::Credentials(msg) => FetchError::CredentialsUnavailable(msg),
            ProviderError::BackendNotFound(backend) => ProcessError::NotFound(backend).into(),
            ProviderError::BackendFailed { code, message, .. } => ProcessError::NonZeroExit {
                code,
                stderr: message,
            }
            .into(),
            ProviderError::IoError(msg) => FetchError::ExtractionFailed(msg),
        }
    }
}
