//! Contracts for the two external capabilities the resolver consumes.
//!
//! - [`ExtractionProvider`] runs one strategy against one source.
//! - [`TokenProvider`] harvests credential bundles.
//!
//! ## Implementing an Extraction Provider
//!
//! ```ignore
//! struct MyBackend;
//!
//! #[async_trait]
//! impl ExtractionProvider for MyBackend {
//!     async fn attempt(
//!         &self,
//!         strategy: &StrategyDescriptor,
//!         source: &SourceRef,
//!         bundle: &CredentialBundle,
//!     ) -> ExtractionOutcome {
//!         match run_backend(strategy, source, bundle).await {
//!             Ok(raw) => ExtractionOutcome::Resolved(raw),
//!             Err(e) => ExtractionOutcome::failed(e.to_string()),
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use relink_core::{CredentialBundle, SourceRef};
use std::collections::BTreeMap;

use crate::error::FetchError;
use crate::strategy::StrategyDescriptor;

// ============================================================================
// Raw Extraction Output
// ============================================================================

/// One format entry reported by a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatEntry {
    /// Format URL.
    pub url: String,
    /// Delivery protocol as reported (e.g. `m3u8_native`, `https`).
    pub protocol: String,
    /// Vertical resolution.
    pub height: Option<u32>,
    /// Total bitrate in kbit/s.
    pub bitrate: Option<f64>,
    /// Carries an audio track.
    pub has_audio: bool,
    /// Carries a video track.
    pub has_video: bool,
}

impl FormatEntry {
    /// Returns true if the format is delivered over the manifest protocol.
    pub fn is_manifest_protocol(&self) -> bool {
        let protocol = self.protocol.to_ascii_lowercase();
        protocol.starts_with("m3u8") || protocol == "hls" || self.url.contains(".m3u8")
    }

    /// Returns true if the format carries both audio and video.
    pub fn is_muxed(&self) -> bool {
        self.has_audio && self.has_video
    }
}

/// Everything a backend surfaced for one successful attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtraction {
    /// Adaptive master manifest, if any.
    pub manifest_url: Option<String>,
    /// Individual formats.
    pub formats: Vec<FormatEntry>,
    /// Backend's single best-guess URL.
    pub direct_url: Option<String>,
    /// Request headers the backend used or recommends.
    pub headers_observed: BTreeMap<String, String>,
}

// ============================================================================
// Extraction Outcome
// ============================================================================

/// Result of one extraction attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// The backend produced output.
    Resolved(RawExtraction),
    /// The backend failed.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

impl ExtractionOutcome {
    /// Creates a failed outcome.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Returns true if the backend produced output.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl From<Result<RawExtraction, FetchError>> for ExtractionOutcome {
    fn from(result: Result<RawExtraction, FetchError>) -> Self {
        match result {
            Ok(raw) => Self::Resolved(raw),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

// ============================================================================
// Provider Traits
// ============================================================================

/// Executes one strategy against one source.
///
/// Calls may take seconds. Implementations must not share mutable state
/// between concurrent calls for different sources.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Attempts extraction. Failures are reported in the outcome, never panicked.
    async fn attempt(
        &self,
        strategy: &StrategyDescriptor,
        source: &SourceRef,
        bundle: &CredentialBundle,
    ) -> ExtractionOutcome;
}

/// Supplies credential bundles.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bundle. With `force_refresh`, any provider-side memo is bypassed.
    async fn fetch(&self, force_refresh: bool) -> Result<CredentialBundle, FetchError>;

    /// Drops any provider-side memo of the last bundle.
    async fn invalidate(&self);
}
