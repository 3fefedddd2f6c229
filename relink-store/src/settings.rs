//! Resolver settings.
//!
//! Loaded from `settings.json` in the config directory. Every field has a
//! default, so a partial file only overrides what it names.

use relink_fetch::{FetchSettings, StrategyCatalog, ValidationPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{
    default_cache_dir, default_credentials_path, default_settings_path, load_json, save_json,
};
use crate::stream_cache::DEFAULT_STREAM_TTL;
use crate::token_cache::DEFAULT_TOKEN_TTL;

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Validity of a resolved stream, in seconds.
    pub stream_ttl_secs: u64,
    /// Validity of a credential bundle, in seconds. Must be below the stream TTL.
    pub token_ttl_secs: u64,
    /// Overall deadline for one resolution, in seconds.
    pub deadline_secs: u64,
    /// Bound on one validation probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Bound on one extraction attempt, in seconds.
    pub extraction_timeout_secs: u64,
    /// Hosts accepted without probing.
    pub skip_validation_domains: Vec<String>,
    /// `Referer` added when absent. Empty disables it.
    pub default_referer: String,
    /// `Origin` added when absent. Empty disables it.
    pub default_origin: String,
    /// Strategies the planner orders.
    pub strategies: StrategyCatalog,
    /// Whether caches are mirrored to disk.
    pub persist_cache: bool,
    /// Cache directory override.
    pub cache_dir: Option<PathBuf>,
    /// Credential file read by the file token provider.
    pub credentials_file: Option<PathBuf>,
    /// Maximum sources resolved at once in batch mode.
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            stream_ttl_secs: DEFAULT_STREAM_TTL.as_secs(),
            token_ttl_secs: DEFAULT_TOKEN_TTL.as_secs(),
            deadline_secs: 90,
            probe_timeout_secs: fetch.probe_timeout.as_secs(),
            extraction_timeout_secs: fetch.extraction_timeout.as_secs(),
            skip_validation_domains: ValidationPolicy::default().skip_domains,
            default_referer: fetch.default_referer.unwrap_or_default(),
            default_origin: fetch.default_origin.unwrap_or_default(),
            strategies: StrategyCatalog::default(),
            persist_cache: true,
            cache_dir: None,
            credentials_file: None,
            concurrency: 4,
        }
    }
}

impl Settings {
    /// Loads settings from the default path.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(&default_settings_path()).await
    }

    /// Loads settings from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails [`Self::validate`].
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let settings = match load_json::<Self>(path).await {
            Ok(settings) => {
                info!(path = %path.display(), "Settings loaded");
                settings
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "Settings file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Saves settings to `path`.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.validate()?;
        save_json(path, self).await
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.token_ttl_secs == 0 || self.stream_ttl_secs == 0 {
            return Err(StoreError::Config("cache TTLs must be positive".to_string()));
        }
        if self.token_ttl_secs >= self.stream_ttl_secs {
            return Err(StoreError::Config(format!(
                "token TTL ({}s) must be shorter than stream TTL ({}s)",
                self.token_ttl_secs, self.stream_ttl_secs
            )));
        }
        if self.deadline_secs == 0 || self.probe_timeout_secs == 0 || self.extraction_timeout_secs == 0 {
            return Err(StoreError::Config("timeouts must be positive".to_string()));
        }
        if self.concurrency == 0 {
            return Err(StoreError::Config("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Stream TTL.
    pub fn stream_ttl(&self) -> Duration {
        Duration::from_secs(self.stream_ttl_secs)
    }

    /// Token TTL.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Overall resolution deadline.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Effective cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    /// Effective credential bundle file.
    pub fn credentials_file(&self) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(default_credentials_path)
    }

    /// Timeouts and header defaults for providers and validators.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            extraction_timeout: Duration::from_secs(self.extraction_timeout_secs),
            default_referer: non_empty(&self.default_referer),
            default_origin: non_empty(&self.default_origin),
        }
    }

    /// Validator skip rules.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy::with_skip_domains(self.skip_validation_domains.clone())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// ============================================================================
// Tests
// ============================================================================
