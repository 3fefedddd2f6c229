//! Resolved-stream cache keyed by source.
//!
//! Entries are stamped with the stream's own `resolved_at`, so a stream
//! restored from disk keeps its original age. Writes to `streams.json` are
//! serialized, and each one snapshots the map after taking the write lock,
//! so the file on disk always ends at the newest state.

use chrono::{DateTime, Utc};
use relink_core::{CacheStats, ResolvedStream, StreamHeaders, UrlKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, remove_file, save_json};
use crate::ttl_cache::{CacheEntry, TtlCache};

/// Default stream validity: 6 hours.
pub const DEFAULT_STREAM_TTL: Duration = Duration::from_secs(6 * 60 * 60);

// ============================================================================
// Persisted Record
// ============================================================================

/// One line of `streams.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    /// Source cache key.
    pub source_key: String,
    /// Playable URL.
    pub url: String,
    /// Playback headers.
    pub headers: StreamHeaders,
    /// Strategy that produced the URL.
    pub strategy: String,
    /// How the URL was selected.
    pub url_kind: UrlKind,
    /// Resolution time.
    pub timestamp: DateTime<Utc>,
}

impl From<&ResolvedStream> for StreamRecord {
    fn from(stream: &ResolvedStream) -> Self {
        Self {
            source_key: stream.source_key.clone(),
            url: stream.url.clone(),
            headers: stream.headers.clone(),
            strategy: stream.strategy_used.clone(),
            url_kind: stream.url_kind,
            timestamp: stream.resolved_at,
        }
    }
}

impl TryFrom<StreamRecord> for ResolvedStream {
    type Error = StoreError;

    fn try_from(record: StreamRecord) -> Result<Self, Self::Error> {
        let stream = ResolvedStream::new(
            record.source_key,
            record.url,
            record.headers,
            record.strategy,
            record.url_kind,
        )?;
        Ok(stream.resolved_at(record.timestamp))
    }
}

// ============================================================================
// Stream Cache
// ============================================================================

/// TTL cache of validated streams, optionally mirrored to `streams.json`.
#[derive(Debug)]
pub struct StreamCache {
    entries: TtlCache<ResolvedStream>,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl StreamCache {
    /// Creates an in-memory cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: TtlCache::new(ttl),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a cache mirrored to `path`, loading live records from it.
    ///
    /// Records that are expired or malformed are dropped.
    pub async fn load(ttl: Duration, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = Self {
            entries: TtlCache::new(ttl),
            path: Some(path.clone()),
            write_lock: Mutex::new(()),
        };

        let records: Vec<StreamRecord> = match load_json(&path).await {
            Ok(records) => records,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable stream cache");
                Vec::new()
            }
        };

        let now = Utc::now();
        let mut loaded = 0;
        for record in records {
            let key = record.source_key.clone();
            match ResolvedStream::try_from(record) {
                Ok(stream) => {
                    let created_at = stream.resolved_at;
                    let entry = CacheEntry::new(stream, created_at);
                    if !entry.is_expired_at(now, ttl) {
                        cache.entries.insert_entry(key, entry).await;
                        loaded += 1;
                    }
                }
                Err(e) => debug!(source = %key, error = %e, "Dropping malformed record"),
            }
        }
        info!(path = %path.display(), loaded, "Stream cache loaded");
        cache
    }

    /// Returns the TTL.
    pub fn ttl(&self) -> Duration {
        self.entries.ttl()
    }

    /// Returns the persistence path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the live stream for `source_key`.
    pub async fn get(&self, source_key: &str) -> Option<Arc<ResolvedStream>> {
        self.entries.get(source_key).await
    }

    /// Returns the stream for `source_key` if live at `now`.
    pub async fn get_at(&self, source_key: &str, now: DateTime<Utc>) -> Option<Arc<ResolvedStream>> {
        self.entries.get_at(source_key, now).await
    }

    /// Stores a validated stream.
    pub async fn put(&self, stream: ResolvedStream) -> Arc<ResolvedStream> {
        let key = stream.source_key.clone();
        let created_at = stream.resolved_at;
        let value = self
            .entries
            .insert_entry(key, CacheEntry::new(stream, created_at))
            .await;
        self.persist().await;
        value
    }

    /// Drops the entry for `source_key`. Returns true if one existed.
    pub async fn invalidate(&self, source_key: &str) -> bool {
        let removed = self.entries.remove(source_key).await;
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Drops every entry and the persisted file.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        self.entries.clear().await;
        if let Some(path) = &self.path {
            if let Err(e) = remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove stream cache file");
            }
        }
    }

    /// Removes expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let removed = self.entries.purge_expired().await;
        if removed > 0 {
            self.persist().await;
        }
        removed
    }

    /// Live and total counts.
    pub async fn stats(&self) -> CacheStats {
        self.entries.stats().await
    }

    /// Writes live entries to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        let mut records: Vec<StreamRecord> = self
            .entries
            .live_entries_at(Utc::now())
            .await
            .iter()
            .map(|(_, e)| StreamRecord::from(e.value.as_ref()))
            .collect();
        records.sort_by(|a, b| a.source_key.cmp(&b.source_key));
        save_json(path, &records).await
    }

    /// Persistence failures never fail a resolution; they are logged.
    async fn persist(&self) {
        if let Err(e) = self.save().await {
            warn!(error = %e, "Failed to persist stream cache");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn stream(key: &str, at: DateTime<Utc>) -> ResolvedStream {
        let mut headers = StreamHeaders::new();
        headers.insert("User-Agent", "UA/1.0");
        headers.insert("Cookie", "SID=1");
        ResolvedStream::new(
            key,
            format!("https://manifest.example.com/{key}.m3u8"),
            headers,
            "tv_embedded",
            UrlKind::Manifest,
        )
        .unwrap()
        .resolved_at(at)
    }

    #[tokio::test]
    async fn test_entry_age_follows_resolved_at() {
        let cache = StreamCache::new(DEFAULT_STREAM_TTL);
        let now = Utc::now();
        cache.put(stream("a", now - TimeDelta::hours(7))).await;
        cache.put(stream("b", now - TimeDelta::hours(5))).await;

        assert!(cache.get_at("a", now).await.is_none());
        assert!(cache.get_at("b", now).await.is_some());
        assert_eq!(cache.stats().await, CacheStats { live: 1, total: 2 });
        assert_eq!(cache.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.json");
        let now = Utc::now();

        let cache = StreamCache::load(DEFAULT_STREAM_TTL, &path).await;
        cache.put(stream("live", now - TimeDelta::hours(1))).await;
        cache.put(stream("stale", now - TimeDelta::hours(8))).await;

        let restored = StreamCache::load(DEFAULT_STREAM_TTL, &path).await;
        let live = restored.get("live").await.unwrap();
        assert_eq!(live.headers.get("Cookie"), Some("SID=1"));
        assert_eq!(live.resolved_at, stream("live", now - TimeDelta::hours(1)).resolved_at);
        assert!(restored.get("stale").await.is_none());
        assert_eq!(restored.stats().await.total, 1);
    }

    #[tokio::test]
    async fn test_record_json_shape() {
        let now = Utc::now();
        let value = serde_json::to_value(StreamRecord::from(&stream("k", now))).unwrap();
        assert_eq!(value["sourceKey"], "k");
        assert_eq!(value["strategy"], "tv_embedded");
        assert_eq!(value["urlKind"], "manifest");
        assert!(value.get("timestamp").is_some());
    }

    #[tokio::test]
    async fn test_malformed_records_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.json");
        let json = serde_json::json!([{
            "sourceKey": "k",
            "url": "https://a/b.m3u8",
            "headers": {"Referer": "x"},
            "strategy": "ios",
            "urlKind": "manifest",
            "timestamp": Utc::now(),
        }]);
        save_json(&path, &json).await.unwrap();

        let cache = StreamCache::load(DEFAULT_STREAM_TTL, &path).await;
        assert_eq!(cache.stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.json");
        let cache = StreamCache::load(DEFAULT_STREAM_TTL, &path).await;
        cache.put(stream("a", Utc::now())).await;

        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);
        let persisted: Vec<StreamRecord> = load_json(&path).await.unwrap();
        assert!(persisted.is_empty());

        cache.put(stream("b", Utc::now())).await;
        cache.clear().await;
        assert!(!path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_puts_all_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.json");
        let cache = Arc::new(StreamCache::load(DEFAULT_STREAM_TTL, &path).await);
        let now = Utc::now();

        let puts: Vec<_> = (0..400)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.put(stream(&format!("src-{i}"), now)).await })
            })
            .collect();
        for put in puts {
            put.await.unwrap();
        }
        assert_eq!(cache.stats().await.total, 400);

        let restored = StreamCache::load(DEFAULT_STREAM_TTL, &path).await;
        assert_eq!(restored.stats().await.total, 400);
        assert!(restored.get("src-0").await.is_some());
        assert!(restored.get("src-399").await.is_some());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invalidate_and_put_agree_with_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.json");
        let cache = Arc::new(StreamCache::load(DEFAULT_STREAM_TTL, &path).await);
        let now = Utc::now();
        for i in 0..50 {
            cache.put(stream(&format!("src-{i}"), now)).await;
        }

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        cache.invalidate(&format!("src-{i}")).await;
                    } else {
                        cache.put(stream(&format!("new-{i}"), now)).await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let persisted: Vec<StreamRecord> = load_json(&path).await.unwrap();
        assert_eq!(persisted.len(), cache.stats().await.total);
        assert_eq!(persisted.len(), 50);
        assert!(persisted.iter().all(|r| r.source_key != "src-0"));
        assert!(persisted.iter().any(|r| r.source_key == "new-49"));
    }
}
