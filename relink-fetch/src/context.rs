//! Fetch context providing access to host APIs.
//!
//! The context is shared by validators and extraction providers and carries
//! the per-call timeouts that keep every external call bounded.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::host::{http::HttpClient, process::ProcessRunner};
use crate::select::HeaderDefaults;
use crate::validator::{HttpValidator, ValidationPolicy};

/// Default `Referer` for YouTube-hosted streams.
pub const DEFAULT_REFERER: &str = "https://www.youtube.com/";

/// Default `Origin` for YouTube-hosted streams.
pub const DEFAULT_ORIGIN: &str = "https://www.youtube.com";

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for provider and validator calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Bound on a single validation probe.
    pub probe_timeout: Duration,
    /// Bound on a single extraction attempt.
    pub extraction_timeout: Duration,
    /// `Referer` added to stream headers when absent.
    pub default_referer: Option<String>,
    /// `Origin` added to stream headers when absent.
    pub default_origin: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            extraction_timeout: Duration::from_secs(30),
            default_referer: Some(DEFAULT_REFERER.to_string()),
            default_origin: Some(DEFAULT_ORIGIN.to_string()),
        }
    }
}

impl FetchSettings {
    /// Sets the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the extraction timeout.
    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Disables the default `Referer` and `Origin` headers.
    pub fn without_default_headers(mut self) -> Self {
        self.default_referer = None;
        self.default_origin = None;
        self
    }

    /// Returns the header defaults used when assembling stream headers.
    pub fn header_defaults(&self) -> HeaderDefaults {
        HeaderDefaults {
            referer: self.default_referer.clone(),
            origin: self.default_origin.clone(),
        }
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Host APIs shared by providers and validators.
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// HTTP client for probes.
    pub http: Arc<HttpClient>,
    /// Process runner for backend commands.
    pub process: Arc<ProcessRunner>,
    /// Fetch settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a context with default settings.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(FetchSettings::default())
    }

    /// Creates a context with custom settings.
    pub fn with_settings(settings: FetchSettings) -> Result<Self, FetchError> {
        Self::builder().settings(settings).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Creates an HTTP validator over this context's client.
    pub fn validator(&self, policy: ValidationPolicy) -> HttpValidator {
        HttpValidator::new(self.http.as_ref().clone(), policy)
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
#[derive(Debug, Default)]
pub struct FetchContextBuilder {
    http: Option<Arc<HttpClient>>,
    process: Option<Arc<ProcessRunner>>,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the process runner.
    pub fn process(mut self, process: Arc<ProcessRunner>) -> Self {
        self.process = Some(process);
        self
    }

    /// Sets the fetch settings.
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the probe timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.settings.probe_timeout = timeout;
        self
    }

    /// Sets the extraction timeout.
    pub fn extraction_timeout(mut self, timeout: Duration) -> Self {
        self.settings.extraction_timeout = timeout;
        self
    }

    /// Builds the fetch context.
    ///
    /// The default HTTP client uses the probe timeout as its request timeout.
    pub fn build(self) -> Result<FetchContext, FetchError> {
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(HttpClient::with_timeout(self.settings.probe_timeout)?),
        };
        Ok(FetchContext {
            http,
            process: self.process.unwrap_or_default(),
            settings: self.settings,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
