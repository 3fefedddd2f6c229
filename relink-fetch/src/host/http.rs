//! HTTP client used for reachability probes.
//!
//! Wraps reqwest with tracing and the two request shapes a probe needs:
//! a `HEAD` and a single-byte ranged `GET`. Redirects are not followed; the
//! probe reports the first status the host answers with.

use relink_core::StreamHeaders;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;
        Ok(Self { inner, timeout })
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a HEAD request with the given headers.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn head(&self, url: &str, headers: &StreamHeaders) -> Result<Response, HttpError> {
        let url = parse_url(url)?;
        let headers = to_header_map(headers)?;
        debug!("HEAD request");

        let response = self.inner.head(url).headers(headers).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a GET request for the first byte only.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get_first_byte(
        &self,
        url: &str,
        headers: &StreamHeaders,
    ) -> Result<Response, HttpError> {
        let url = parse_url(url)?;
        let mut headers = to_header_map(headers)?;
        headers.insert(RANGE, HeaderValue::from_static("bytes=0-0"));
        debug!("Ranged GET request");

        let response = self.inner.get(url).headers(headers).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_url(url: &str) -> Result<Url, HttpError> {
    Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))
}

/// Converts stream headers into a reqwest header map.
pub fn to_header_map(headers: &StreamHeaders) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Returns true if the URL's host is `domain` or a subdomain of it.
pub fn host_matches(url: &str, domain: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

// ============================================================================
// Tests
// ============================================================================
