//! Resolved streams and their headers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;

/// Canonical `User-Agent` header name.
pub const USER_AGENT: &str = "User-Agent";
/// Canonical `Cookie` header name.
pub const COOKIE: &str = "Cookie";

// ============================================================================
// URL Kind
// ============================================================================

/// How a resolved URL was chosen from an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    /// Adaptive master manifest covering several renditions.
    Manifest,
    /// One manifest-protocol rendition picked from a format list.
    MediaFormat,
    /// The backend's best-guess direct URL. Lowest confidence.
    Direct,
}

impl UrlKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::MediaFormat => "media format",
            Self::Direct => "direct",
        }
    }

    /// Confidence that the URL plays, 0 (low) to 2 (high).
    pub fn confidence(&self) -> u8 {
        match self {
            Self::Manifest => 2,
            Self::MediaFormat => 1,
            Self::Direct => 0,
        }
    }
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Stream Headers
// ============================================================================

/// HTTP headers a player must send with a resolved URL.
///
/// Names are case-insensitive and unique: every name is stored in canonical
/// form (`user-agent` becomes `User-Agent`), so inserting a differently cased
/// duplicate replaces the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct StreamHeaders(BTreeMap<String, String>);

impl StreamHeaders {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a header.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(canonical_name(name), value.into());
    }

    /// Inserts a header only if no header with that name exists yet.
    pub fn insert_if_absent(&mut self, name: &str, value: impl Into<String>) {
        self.0.entry(canonical_name(name)).or_insert_with(|| value.into());
    }

    /// Looks up a header by any casing of its name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&canonical_name(name)).map(String::as_str)
    }

    /// Returns true if a header with that name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&canonical_name(name))
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&canonical_name(name))
    }

    /// Returns a copy without the named header.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.remove(name);
        copy
    }

    /// Iterates headers in canonical-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for StreamHeaders {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<StreamHeaders> for BTreeMap<String, String> {
    fn from(headers: StreamHeaders) -> Self {
        headers.0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for StreamHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

/// Canonicalises a header name: each dash-separated segment is title-cased.
fn canonical_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

// ============================================================================
// Resolved Stream
// ============================================================================

/// A playable URL that passed validation, with the headers to play it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStream {
    /// Cache key of the source this stream was resolved for.
    pub source_key: String,
    /// Playable URL.
    pub url: String,
    /// Headers the player must send. Always contains `User-Agent`.
    pub headers: StreamHeaders,
    /// Name of the strategy that produced the URL.
    pub strategy_used: String,
    /// How the URL was selected.
    pub url_kind: UrlKind,
    /// When the stream was resolved.
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedStream {
    /// Creates a stream resolved now.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingHeader`] if `headers` lacks `User-Agent`,
    /// or [`CoreError::InvalidData`] if the URL is blank.
    pub fn new(
        source_key: impl Into<String>,
        url: impl Into<String>,
        headers: StreamHeaders,
        strategy_used: impl Into<String>,
        url_kind: UrlKind,
    ) -> Result<Self, CoreError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(CoreError::InvalidData("empty stream URL".to_string()));
        }
        if headers.get(USER_AGENT).is_none_or(|ua| ua.trim().is_empty()) {
            return Err(CoreError::MissingHeader(USER_AGENT));
        }

        Ok(Self {
            source_key: source_key.into(),
            url,
            headers,
            strategy_used: strategy_used.into(),
            url_kind,
            resolved_at: Utc::now(),
        })
    }

    /// Overrides the resolution timestamp.
    #[must_use]
    pub fn resolved_at(mut self, at: DateTime<Utc>) -> Self {
        self.resolved_at = at;
        self
    }

    /// The user agent the player must use.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get(USER_AGENT)
    }

    /// Returns true if the stream carries a cookie header.
    pub fn has_cookie(&self) -> bool {
        self.headers.contains(COOKIE)
    }

    /// Renders the `url|Name=value&Name=value` form accepted by IPTV players.
    pub fn player_url(&self) -> String {
        if self.headers.is_empty() {
            return self.url.clone();
        }
        let pairs: Vec<String> = self
            .headers
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}|{}", self.url, pairs.join("&"))
    }
}

// ============================================================================
// Tests
// ============================================================================
