//! File and environment credential provider.
//!
//! Reads a pre-exported credential bundle from a JSON file. Individual fields
//! can be overridden from the environment:
//!
//! - `RELINK_USER_AGENT`
//! - `RELINK_COOKIES`
//! - `RELINK_VISITOR_DATA`
//! - `RELINK_PROOF_TOKEN`
//!
//! The last bundle read is memoized until [`TokenProvider::invalidate`] or a
//! forced fetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relink_core::CredentialBundle;
use relink_fetch::{FetchError, TokenProvider};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::ProviderError;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable overriding the user agent.
pub const USER_AGENT_ENV: &str = "RELINK_USER_AGENT";

/// Environment variable overriding the cookie header.
pub const COOKIES_ENV: &str = "RELINK_COOKIES";

/// Environment variable overriding the visitor data.
pub const VISITOR_DATA_ENV: &str = "RELINK_VISITOR_DATA";

/// Environment variable overriding the proof token.
pub const PROOF_TOKEN_ENV: &str = "RELINK_PROOF_TOKEN";

// ============================================================================
// Credential File
// ============================================================================

/// On-disk credential bundle. Accepts camelCase and snake_case keys.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialFile {
    /// Browser user agent the session was captured with.
    #[serde(default, alias = "user_agent")]
    pub user_agent: Option<String>,
    /// `Cookie` header value.
    #[serde(default)]
    pub cookies: Option<String>,
    /// Visitor identifier.
    #[serde(default, alias = "visitor_data")]
    pub visitor_data: Option<String>,
    /// Proof-of-origin token.
    #[serde(default, alias = "proof_token", alias = "poToken", alias = "po_token")]
    pub proof_token: Option<String>,
    /// `Accept-Language` locale.
    #[serde(default)]
    pub locale: Option<String>,
    /// Backend format selector.
    #[serde(default, alias = "preferred_format")]
    pub preferred_format: Option<String>,
    /// When the bundle was harvested. Defaults to the file's modification time.
    #[serde(default, alias = "captured_at")]
    pub captured_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Overrides
// ============================================================================

/// Field overrides applied on top of the credential file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    /// From `RELINK_USER_AGENT`.
    pub user_agent: Option<String>,
    /// From `RELINK_COOKIES`.
    pub cookies: Option<String>,
    /// From `RELINK_VISITOR_DATA`.
    pub visitor_data: Option<String>,
    /// From `RELINK_PROOF_TOKEN`.
    pub proof_token: Option<String>,
}

impl CredentialOverrides {
    /// Reads overrides from the `RELINK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads overrides through an arbitrary lookup. Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            user_agent: get(USER_AGENT_ENV),
            cookies: get(COOKIES_ENV),
            visitor_data: get(VISITOR_DATA_ENV),
            proof_token: get(PROOF_TOKEN_ENV),
        }
    }

    /// Returns true if no override is set.
    pub fn is_empty(&self) -> bool {
        self.user_agent.is_none()
            && self.cookies.is_none()
            && self.visitor_data.is_none()
            && self.proof_token.is_none()
    }
}

// ============================================================================
// File Token Provider
// ============================================================================

/// Token provider reading a credential file plus environment overrides.
#[derive(Debug)]
pub struct FileTokenProvider {
    path: PathBuf,
    overrides: CredentialOverrides,
    memo: RwLock<Option<CredentialBundle>>,
}

impl FileTokenProvider {
    /// Creates a provider for the given file with no overrides.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overrides: CredentialOverrides::default(),
            memo: RwLock::new(None),
        }
    }

    /// Creates a provider for the given file with overrides from the environment.
    pub fn from_env(path: impl Into<PathBuf>) -> Self {
        Self::new(path).with_overrides(CredentialOverrides::from_env())
    }

    /// Sets the field overrides.
    pub fn with_overrides(mut self, overrides: CredentialOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file and applies overrides.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn read_bundle(&self) -> Result<CredentialBundle, ProviderError> {
        let (file, modified) = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let file: CredentialFile = serde_json::from_str(&content).map_err(|e| {
                    ProviderError::Credentials(format!("{}: {e}", self.path.display()))
                })?;
                let modified = tokio::fs::metadata(&self.path)
                    .await
                    .and_then(|m| m.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);
                (file, modified)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !self.overrides.is_empty() => {
                debug!("No credential file, using environment only");
                (CredentialFile::default(), None)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::Credentials(format!(
                    "{} does not exist",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        self.merge(file, modified)
    }

    fn merge(
        &self,
        file: CredentialFile,
        modified: Option<DateTime<Utc>>,
    ) -> Result<CredentialBundle, ProviderError> {
        let overrides = self.overrides.clone();
        let user_agent = overrides
            .user_agent
            .or(file.user_agent)
            .filter(|ua| !ua.trim().is_empty())
            .ok_or_else(|| ProviderError::Credentials("no user agent".to_string()))?;

        let mut bundle = CredentialBundle::new(user_agent)
            .with_cookies(overrides.cookies.or(file.cookies).unwrap_or_default())
            .with_visitor_data(overrides.visitor_data.or(file.visitor_data).unwrap_or_default())
            .with_proof_token(overrides.proof_token.or(file.proof_token).unwrap_or_default());

        if let Some(locale) = file.locale.filter(|l| !l.trim().is_empty()) {
            bundle = bundle.with_locale(locale);
        }
        if let Some(format) = file.preferred_format.filter(|f| !f.trim().is_empty()) {
            bundle = bundle.with_preferred_format(format);
        }
        if let Some(at) = file.captured_at.or(modified) {
            bundle = bundle.captured_at(at);
        }
        Ok(bundle)
    }
}

#[async_trait]
impl TokenProvider for FileTokenProvider {
    async fn fetch(&self, force_refresh: bool) -> Result<CredentialBundle, FetchError> {
        if !force_refresh {
            if let Some(bundle) = self.memo.read().await.clone() {
                debug!("Using memoized credentials");
                return Ok(bundle);
            }
        }

        match self.read_bundle().await {
            Ok(bundle) => {
                info!(
                    fields = ?bundle.present_fields(),
                    force_refresh,
                    "Loaded credentials"
                );
                *self.memo.write().await = Some(bundle.clone());
                Ok(bundle)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load credentials");
                Err(e.into())
            }
        }
    }

    async fn invalidate(&self) {
        *self.memo.write().await = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
