//! Sharded TTL map.
//!
//! Values are stored behind `Arc` and replaced, never mutated, so readers
//! can hold a value while another task overwrites the entry. Each shard has
//! its own lock; no lock is ever held across an await outside this module.

use chrono::{DateTime, Utc};
use relink_core::CacheStats;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Default shard count.
const DEFAULT_SHARDS: usize = 16;

// ============================================================================
// Cache Entry
// ============================================================================

/// A cached value and when it was stored.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// Shared value.
    pub value: Arc<V>,
    /// When the value was stored.
    pub created_at: DateTime<Utc>,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            created_at: self.created_at,
        }
    }
}

impl<V> CacheEntry<V> {
    /// Creates an entry stored at `created_at`.
    pub fn new(value: V, created_at: DateTime<Utc>) -> Self {
        Self {
            value: Arc::new(value),
            created_at,
        }
    }

    /// Age at `now`. Entries stamped in the future have age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Expired iff `now - created_at > ttl`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) > ttl
    }
}

// ============================================================================
// TTL Cache
// ============================================================================

/// A string-keyed map whose entries expire after a fixed TTL.
///
/// Expired entries stay in storage (and count toward `total`) until they are
/// read, overwritten, or purged.
#[derive(Debug)]
pub struct TtlCache<V> {
    shards: Vec<RwLock<HashMap<String, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<V> TtlCache<V> {
    /// Creates a cache with the default shard count.
    pub fn new(ttl: Duration) -> Self {
        Self::with_shards(ttl, DEFAULT_SHARDS)
    }

    /// Creates a cache with `shards` independent locks.
    pub fn with_shards(ttl: Duration, shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| RwLock::default()).collect();
        Self { shards, ttl }
    }

    /// Returns the TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn shard(&self, key: &str) -> &RwLock<HashMap<String, CacheEntry<V>>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        // Modulo keeps the value below the shard count, which fits in usize.
        #[allow(clippy::cast_possible_truncation)]
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Returns the live value for `key`.
    pub async fn get(&self, key: &str) -> Option<Arc<V>> {
        self.get_at(key, Utc::now()).await
    }

    /// Returns the value for `key` if it is live at `now`.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Arc<V>> {
        self.entry_at(key, now).await.map(|e| e.value)
    }

    /// Returns the live entry for `key` at `now`.
    pub async fn entry_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry<V>> {
        let shard = self.shard(key).read().await;
        shard
            .get(key)
            .filter(|e| !e.is_expired_at(now, self.ttl))
            .cloned()
    }

    /// Stores `value` under `key`, stamped now.
    pub async fn insert(&self, key: impl Into<String>, value: V) -> Arc<V> {
        self.insert_entry(key, CacheEntry::new(value, Utc::now()))
            .await
    }

    /// Stores a pre-stamped entry, replacing any previous one.
    pub async fn insert_entry(&self, key: impl Into<String>, entry: CacheEntry<V>) -> Arc<V> {
        let key = key.into();
        let value = Arc::clone(&entry.value);
        self.shard(&key).write().await.insert(key, entry);
        value
    }

    /// Removes `key`. Returns true if an entry existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.shard(key).write().await.remove(key).is_some()
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        for shard in &self.shards {
            shard.write().await.clear();
        }
    }

    /// Removes entries expired at `now`. Returns how many were removed.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut map = shard.write().await;
            let before = map.len();
            map.retain(|_, e| !e.is_expired_at(now, self.ttl));
            removed += before - map.len();
        }
        removed
    }

    /// Removes entries expired now.
    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now()).await
    }

    /// Live and total counts at `now`.
    pub async fn stats_at(&self, now: DateTime<Utc>) -> CacheStats {
        let mut stats = CacheStats::default();
        for shard in &self.shards {
            let map = shard.read().await;
            stats.total += map.len();
            stats.live += map
                .values()
                .filter(|e| !e.is_expired_at(now, self.ttl))
                .count();
        }
        stats
    }

    /// Live and total counts now.
    pub async fn stats(&self) -> CacheStats {
        self.stats_at(Utc::now()).await
    }

    /// Live entries at `now`, for persistence.
    pub async fn live_entries_at(&self, now: DateTime<Utc>) -> Vec<(String, CacheEntry<V>)> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let map = shard.read().await;
            out.extend(
                map.iter()
                    .filter(|(_, e)| !e.is_expired_at(now, self.ttl))
                    .map(|(k, e)| (k.clone(), e.clone())),
            );
        }
        out
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_ttl_boundary_is_inclusive() {
        let cache = TtlCache::new(TTL);
        let t0 = Utc::now();
        cache.insert_entry("k", CacheEntry::new(1, t0)).await;

        assert_eq!(*cache.get_at("k", t0).await.unwrap(), 1);
        assert!(cache.get_at("k", t0 + TimeDelta::seconds(60)).await.is_some());
        assert!(
            cache
                .get_at("k", t0 + TimeDelta::milliseconds(60_001))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_expired_entries_count_until_purged() {
        let cache = TtlCache::with_shards(TTL, 4);
        let t0 = Utc::now();
        cache.insert_entry("old", CacheEntry::new("a", t0 - TimeDelta::hours(1))).await;
        cache.insert_entry("new", CacheEntry::new("b", t0)).await;

        assert_eq!(cache.stats_at(t0).await, CacheStats { live: 1, total: 2 });
        assert_eq!(cache.purge_expired_at(t0).await, 1);
        assert_eq!(cache.stats_at(t0).await, CacheStats { live: 1, total: 1 });
    }

    #[tokio::test]
    async fn test_insert_replaces_and_readers_keep_old_value() {
        let cache = TtlCache::new(TTL);
        let old = cache.insert("k", String::from("old")).await;
        cache.insert("k", String::from("new")).await;

        assert_eq!(old.as_str(), "old");
        assert_eq!(cache.get("k").await.unwrap().as_str(), "new");
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cache = TtlCache::new(TTL);
        cache.insert("a", 1).await;
        cache.insert("b", 2).await;

        assert!(cache.remove("a").await);
        assert!(!cache.remove("a").await);
        cache.clear().await;
        assert_eq!(cache.stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_future_stamped_entry_is_live() {
        let cache = TtlCache::new(TTL);
        let now = Utc::now();
        cache
            .insert_entry("k", CacheEntry::new(1, now + TimeDelta::hours(1)))
            .await;
        assert!(cache.get_at("k", now).await.is_some());
    }

    #[tokio::test]
    async fn test_live_entries_skip_expired() {
        let cache = TtlCache::new(TTL);
        let now = Utc::now();
        cache.insert_entry("old", CacheEntry::new(1, now - TimeDelta::hours(2))).await;
        cache.insert_entry("new", CacheEntry::new(2, now)).await;

        let live = cache.live_entries_at(now).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, "new");
    }
}
