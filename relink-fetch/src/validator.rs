//! Reachability checks for candidate stream URLs.
//!
//! A candidate is probed with the same headers the player will send. Signed
//! media hosts that reject cheap probes are skipped outright, and transient
//! network failures fall back to a URL-shape heuristic so a flaky probe does
//! not discard an otherwise good resolution.
//!
//! Probes do not follow redirects. A 3xx answer means the signed URL was
//! accepted and handed to an edge host, so it counts as reachable.

use async_trait::async_trait;
use regex::Regex;
use relink_core::{COOKIE, StreamHeaders};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::HttpError;
use crate::host::http::{HttpClient, host_matches};

/// Domain skipped by default: signed media URLs there reject HEAD probes.
pub const DEFAULT_SKIP_DOMAIN: &str = "googlevideo.com";

static DELIVERY_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\.m3u8|/manifest/|/hls_playlist/|/playlist/index)").expect("Invalid regex")
});

static DELIVERY_HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^manifest\.").expect("Invalid regex"));

// ============================================================================
// Validation Result
// ============================================================================

/// How a validation verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    /// An HTTP probe answered.
    Probe,
    /// The host is on the skip list; nothing was sent.
    Skipped,
    /// The probe failed at the network level; the URL shape decided.
    Heuristic,
}

impl ValidationMethod {
    /// Returns the display name for this method.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Skipped => "skipped",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Verdict for one candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    /// Whether the URL is considered playable.
    pub ok: bool,
    /// Final HTTP status, when a probe answered.
    pub status: Option<u16>,
    /// How the verdict was reached.
    pub method: ValidationMethod,
}

impl Validation {
    /// A verdict from an HTTP status.
    pub fn probed(status: u16) -> Self {
        Self {
            ok: is_reachable_status(status),
            status: Some(status),
            method: ValidationMethod::Probe,
        }
    }

    /// A pass without probing.
    pub fn skipped() -> Self {
        Self {
            ok: true,
            status: None,
            method: ValidationMethod::Skipped,
        }
    }

    /// A verdict from the URL shape alone.
    pub fn heuristic(ok: bool) -> Self {
        Self {
            ok,
            status: None,
            method: ValidationMethod::Heuristic,
        }
    }

    /// A rejection with no status, e.g. a malformed URL.
    pub fn rejected() -> Self {
        Self {
            ok: false,
            status: None,
            method: ValidationMethod::Probe,
        }
    }
}

/// 2xx (206 included) and 3xx are reachable.
pub fn is_reachable_status(status: u16) -> bool {
    (200..400).contains(&status)
}

fn is_auth_rejection(status: u16) -> bool {
    status == 401 || status == 403
}

fn is_probe_unsupported(status: u16) -> bool {
    status == 405 || status == 501
}

/// Returns true if the URL looks like a manifest or media delivery URL.
pub fn looks_like_delivery_url(url: &str) -> bool {
    if DELIVERY_PATH_RE.is_match(url) {
        return true;
    }
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| DELIVERY_HOST_RE.is_match(h)))
        .unwrap_or(false)
}

// ============================================================================
// Validator Trait
// ============================================================================

/// Checks whether a URL+headers pair is playable.
#[async_trait]
pub trait StreamValidator: Send + Sync {
    /// Validates `url` with the headers the player will send.
    ///
    /// Never takes longer than roughly `timeout` per request issued.
    async fn validate(&self, url: &str, headers: &StreamHeaders, timeout: Duration) -> Validation;
}

// ============================================================================
// HTTP Validator
// ============================================================================

/// Validation rules that are not HTTP mechanics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Hosts (and their subdomains) accepted without probing.
    pub skip_domains: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            skip_domains: vec![DEFAULT_SKIP_DOMAIN.to_string()],
        }
    }
}

impl ValidationPolicy {
    /// Creates a policy with the given skip list.
    pub fn with_skip_domains(skip_domains: Vec<String>) -> Self {
        Self { skip_domains }
    }

    /// Returns true if the URL's host is on the skip list.
    pub fn should_skip(&self, url: &str) -> bool {
        self.skip_domains.iter().any(|d| host_matches(url, d))
    }
}

/// Probes candidates over HTTP.
#[derive(Debug, Clone)]
pub struct HttpValidator {
    client: HttpClient,
    policy: ValidationPolicy,
}

impl HttpValidator {
    /// Creates a validator.
    pub fn new(client: HttpClient, policy: ValidationPolicy) -> Self {
        Self { client, policy }
    }

    /// Returns the policy.
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// HEAD, falling back to a one-byte GET when HEAD is not supported.
    async fn probe(
        &self,
        url: &str,
        headers: &StreamHeaders,
        timeout: Duration,
    ) -> Result<u16, HttpError> {
        let status = bounded(timeout, self.client.head(url, headers)).await?;
        if !is_probe_unsupported(status) {
            return Ok(status);
        }
        debug!(status, "HEAD unsupported, trying ranged GET");
        bounded(timeout, self.client.get_first_byte(url, headers)).await
    }

    fn fallback(&self, url: &str, error: &HttpError) -> Validation {
        if error.is_network() {
            let ok = looks_like_delivery_url(url);
            warn!(error = %error, accepted = ok, "Probe failed, using URL heuristic");
            Validation::heuristic(ok)
        } else {
            warn!(error = %error, "Probe could not be issued");
            Validation::rejected()
        }
    }
}

async fn bounded<F>(timeout: Duration, request: F) -> Result<u16, HttpError>
where
    F: std::future::Future<Output = Result<reqwest::Response, HttpError>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(response) => Ok(response?.status().as_u16()),
        Err(_) => Err(HttpError::Timeout),
    }
}

#[async_trait]
impl StreamValidator for HttpValidator {
    #[instrument(skip(self, headers), fields(url = %url))]
    async fn validate(&self, url: &str, headers: &StreamHeaders, timeout: Duration) -> Validation {
        if self.policy.should_skip(url) {
            debug!("Host on skip list, not probing");
            return Validation::skipped();
        }

        let status = match self.probe(url, headers, timeout).await {
            Ok(status) => status,
            Err(e) => return self.fallback(url, &e),
        };

        if is_auth_rejection(status) && headers.contains(COOKIE) {
            debug!(status, "Probe rejected with cookie, retrying without");
            let stripped = headers.without(COOKIE);
            return match self.probe(url, &stripped, timeout).await {
                Ok(status) => Validation::probed(status),
                Err(e) => self.fallback(url, &e),
            };
        }

        let validation = Validation::probed(status);
        debug!(status, ok = validation.ok, "Probe answered");
        validation
    }
}

// ============================================================================
// Tests
// ============================================================================
