//! Credential bundle cache.
//!
//! Holds at most one bundle: the last one the token provider harvested.
//! Updates of the slot and of `tokens.json` happen under one write lock, so
//! a removal and a write can never leave the file out of step with memory.

use chrono::{DateTime, Utc};
use relink_core::{CacheStats, CredentialBundle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, remove_file, save_json};
use crate::ttl_cache::CacheEntry;

/// Default credential validity: 45 minutes.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

/// Contents of `tokens.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Cached bundle.
    pub bundle: CredentialBundle,
    /// When the bundle was cached.
    pub timestamp: DateTime<Utc>,
}

/// Single-slot TTL cache for the credential bundle.
#[derive(Debug)]
pub struct TokenCache {
    slot: RwLock<Option<CacheEntry<CredentialBundle>>>,
    ttl: Duration,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl TokenCache {
    /// Creates an in-memory cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a cache mirrored to `path`, restoring a live bundle from it.
    pub async fn load(ttl: Duration, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let restored = match load_json::<TokenRecord>(&path).await {
            Ok(record) => {
                let entry = CacheEntry::new(record.bundle, record.timestamp);
                if entry.is_expired_at(Utc::now(), ttl) {
                    debug!("Persisted credentials expired");
                    None
                } else {
                    info!(path = %path.display(), "Credentials restored");
                    Some(entry)
                }
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable token cache");
                None
            }
        };

        Self {
            slot: RwLock::new(restored),
            ttl,
            path: Some(path),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the persistence path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the bundle if live.
    pub async fn get(&self) -> Option<Arc<CredentialBundle>> {
        self.get_at(Utc::now()).await
    }

    /// Returns the bundle if live at `now`.
    pub async fn get_at(&self, now: DateTime<Utc>) -> Option<Arc<CredentialBundle>> {
        self.entry_at(now).await.map(|e| e.value)
    }

    /// Returns the live entry at `now`.
    pub async fn entry_at(&self, now: DateTime<Utc>) -> Option<CacheEntry<CredentialBundle>> {
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|e| !e.is_expired_at(now, self.ttl))
            .cloned()
    }

    /// Returns the stored entry regardless of expiry.
    pub async fn peek(&self) -> Option<CacheEntry<CredentialBundle>> {
        self.slot.read().await.clone()
    }

    /// Caches `bundle`, stamped now.
    pub async fn put(&self, bundle: CredentialBundle) -> Arc<CredentialBundle> {
        self.put_at(bundle, Utc::now()).await
    }

    /// Caches `bundle`, stamped `at`.
    pub async fn put_at(&self, bundle: CredentialBundle, at: DateTime<Utc>) -> Arc<CredentialBundle> {
        let entry = CacheEntry::new(bundle, at);
        let value = Arc::clone(&entry.value);
        let _guard = self.write_lock.lock().await;
        *self.slot.write().await = Some(entry);
        if let Err(e) = self.write_file().await {
            warn!(error = %e, "Failed to persist token cache");
        }
        value
    }

    /// Drops the cached bundle and its file.
    pub async fn invalidate(&self) {
        let _guard = self.write_lock.lock().await;
        *self.slot.write().await = None;
        if let Some(path) = &self.path {
            if let Err(e) = remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove token cache file");
            }
        }
        debug!("Credential cache invalidated");
    }

    /// Drops the bundle if expired. Returns 1 if it was removed.
    pub async fn purge_expired(&self) -> usize {
        let expired = self
            .slot
            .read()
            .await
            .as_ref()
            .is_some_and(|e| e.is_expired_at(Utc::now(), self.ttl));
        if expired {
            self.invalidate().await;
            1
        } else {
            0
        }
    }

    /// Live and total counts (each at most one).
    pub async fn stats(&self) -> CacheStats {
        let now = Utc::now();
        match self.slot.read().await.as_ref() {
            Some(e) if e.is_expired_at(now, self.ttl) => CacheStats { live: 0, total: 1 },
            Some(_) => CacheStats { live: 1, total: 1 },
            None => CacheStats::default(),
        }
    }

    /// Writes the bundle to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_file().await
    }

    /// Callers hold `write_lock`.
    async fn write_file(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let record = self.slot.read().await.as_ref().map(|e| TokenRecord {
            bundle: e.value.as_ref().clone(),
            timestamp: e.created_at,
        });
        match record {
            Some(record) => save_json(path, &record).await,
            None => remove_file(path).await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
