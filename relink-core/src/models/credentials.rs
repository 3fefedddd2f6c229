//! Harvested session identity.
//!
//! Signed delivery URLs are bound to the client that requested them, so the
//! same [`CredentialBundle`] must be used for extraction and for playback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Generic desktop user agent used when no harvested identity is available.
pub const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

// ============================================================================
// Credential Field
// ============================================================================

/// A credential field a strategy may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    /// Real browser user agent.
    UserAgent,
    /// Session cookie header.
    Cookies,
    /// Visitor/session identifier.
    VisitorData,
    /// Proof-of-origin token.
    ProofToken,
}

impl CredentialField {
    /// Returns the display name for this field.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::UserAgent => "user agent",
            Self::Cookies => "cookies",
            Self::VisitorData => "visitor data",
            Self::ProofToken => "proof token",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Credential Bundle
// ============================================================================

/// Session credentials harvested together from one browser session.
///
/// A bundle is immutable once captured. Fields from different bundles are
/// never combined.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBundle {
    /// User agent of the harvesting session.
    pub user_agent: String,
    /// Raw `Cookie` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
    /// Visitor/session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_data: Option<String>,
    /// Proof-of-origin token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_token: Option<String>,
    /// Interface locale, e.g. `pt-BR`.
    pub locale: String,
    /// Preferred format selector passed to extraction backends.
    pub preferred_format: String,
    /// When the bundle was harvested.
    pub captured_at: DateTime<Utc>,
}

impl CredentialBundle {
    /// Creates a bundle with only a user agent, captured now.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            cookies: None,
            visitor_data: None,
            proof_token: None,
            locale: "en-US".to_string(),
            preferred_format: "best".to_string(),
            captured_at: Utc::now(),
        }
    }

    /// Bundle used when the token provider produced nothing usable.
    pub fn anonymous() -> Self {
        Self::new(FALLBACK_USER_AGENT)
    }

    /// Sets the cookie header. Blank values are dropped.
    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = non_blank(cookies.into());
        self
    }

    /// Sets the visitor data. Blank values are dropped.
    pub fn with_visitor_data(mut self, visitor_data: impl Into<String>) -> Self {
        self.visitor_data = non_blank(visitor_data.into());
        self
    }

    /// Sets the proof token. Blank values are dropped.
    pub fn with_proof_token(mut self, proof_token: impl Into<String>) -> Self {
        self.proof_token = non_blank(proof_token.into());
        self
    }

    /// Sets the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Sets the preferred format selector.
    pub fn with_preferred_format(mut self, format: impl Into<String>) -> Self {
        self.preferred_format = format.into();
        self
    }

    /// Overrides the capture timestamp.
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = at;
        self
    }

    /// Returns true if the given field carries a non-blank value.
    pub fn has(&self, field: CredentialField) -> bool {
        match field {
            CredentialField::UserAgent => !self.user_agent.trim().is_empty(),
            CredentialField::Cookies => is_present(self.cookies.as_deref()),
            CredentialField::VisitorData => is_present(self.visitor_data.as_deref()),
            CredentialField::ProofToken => is_present(self.proof_token.as_deref()),
        }
    }

    /// Returns true if a proof token is present.
    pub fn has_proof_token(&self) -> bool {
        self.has(CredentialField::ProofToken)
    }

    /// Returns true if the bundle can be used at all.
    pub fn is_usable(&self) -> bool {
        self.has(CredentialField::UserAgent)
    }

    /// Fields present in this bundle.
    pub fn present_fields(&self) -> Vec<CredentialField> {
        [
            CredentialField::UserAgent,
            CredentialField::Cookies,
            CredentialField::VisitorData,
            CredentialField::ProofToken,
        ]
        .into_iter()
        .filter(|f| self.has(*f))
        .collect()
    }

    /// Age of the bundle at `now`. Bundles captured in the future have age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.captured_at).to_std().unwrap_or(Duration::ZERO)
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn redact(value: Option<&String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => format!("<{} chars>", v.len()),
        _ => "<absent>".to_string(),
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("user_agent", &self.user_agent)
            .field("cookies", &redact(self.cookies.as_ref()))
            .field("visitor_data", &redact(self.visitor_data.as_ref()))
            .field("proof_token", &redact(self.proof_token.as_ref()))
            .field("locale", &self.locale)
            .field("preferred_format", &self.preferred_format)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
