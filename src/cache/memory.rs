//! In-process cache store.
//!
//! [`MemoryStore`] keeps entries in a moka LRU cache, bounded by entry count.
//! Freshness is decided against an injected [`Clock`]; moka only handles
//! capacity and physical removal once an entry is past its stale retention
//! window.
//!
//! # Tag index
//!
//! Tags live in a side index `tag -> {key -> generation}`. Every write gets a
//! fresh generation number, and moka's eviction listener unindexes an entry
//! only if the index still points at that exact generation. A concurrent
//! rewrite of the same key therefore never loses its index entry, so tag
//! invalidation can over-remove under races but never under-remove. A rewrite
//! unindexes the tags the replaced slot carried and the new slot does not.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use tracing::debug;

use super::store::expiry_after;
use super::{CacheEntry, CacheKey, CacheStore, Clock, MAX_TTL, SystemClock};
use crate::Result;
use crate::telemetry;

/// Configuration for the in-memory store.
///
/// ```rust
/// # use marquee::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(50_000)
///     .stale_retention(Duration::from_secs(6 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// How long an expired entry is kept for stale fallback. Default: 24 hours.
    pub stale_retention: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            stale_retention: Duration::from_secs(24 * 3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set how long expired entries remain available for stale fallback.
    /// Clamped to [`MAX_TTL`].
    pub fn stale_retention(mut self, retention: Duration) -> Self {
        self.stale_retention = retention.min(MAX_TTL);
        self
    }
}

struct Slot {
    entry: CacheEntry,
    generation: u64,
    retain_for: Duration,
}

type TagIndex = DashMap<String, HashMap<CacheKey, u64>>;

struct RetentionExpiry;

impl Expiry<CacheKey, Arc<Slot>> for RetentionExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        slot: &Arc<Slot>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(slot.retain_for)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        slot: &Arc<Slot>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(slot.retain_for)
    }
}

/// Thread-safe in-process [`CacheStore`].
pub struct MemoryStore {
    cache: Cache<CacheKey, Arc<Slot>>,
    index: Arc<TagIndex>,
    generation: AtomicU64,
    stale_retention: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create a store on the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store that reads time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let index: Arc<TagIndex> = Arc::new(DashMap::new());
        let listener_index = Arc::clone(&index);
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(RetentionExpiry)
            .eviction_listener(move |key: Arc<CacheKey>, slot: Arc<Slot>, cause| {
                if cause != RemovalCause::Replaced {
                    unindex(&listener_index, &key, &slot);
                }
            })
            .build();
        Self {
            cache,
            index,
            generation: AtomicU64::new(0),
            stale_retention: config.stale_retention,
            clock,
        }
    }

    /// Look up a slot, dropping it if it is past stale retention.
    fn retained(&self, key: &CacheKey) -> Option<CacheEntry> {
        let slot = self.cache.get(key)?;
        if !slot.entry.is_retained(self.clock.now(), self.stale_retention) {
            self.cache.invalidate(key);
            return None;
        }
        Some(slot.entry.clone())
    }

    /// Number of distinct tags currently indexed.
    pub fn indexed_tags(&self) -> usize {
        self.index.len()
    }
}

fn unindex(index: &TagIndex, key: &CacheKey, slot: &Slot) {
    unindex_tags(index, key, slot.generation, &slot.entry.tags);
}

/// Drop `key` from each tag's index, but only where it still points at
/// `generation`.
fn unindex_tags<'a>(
    index: &TagIndex,
    key: &CacheKey,
    generation: u64,
    tags: impl IntoIterator<Item = &'a String>,
) {
    for tag in tags {
        let now_empty = match index.get_mut(tag) {
            Some(mut keys) => {
                if keys.get(key) == Some(&generation) {
                    keys.remove(key);
                }
                keys.is_empty()
            }
            None => false,
        };
        if now_empty {
            index.remove_if(tag, |_, keys| keys.is_empty());
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let now = self.clock.now();
        Ok(self.retained(key).filter(|entry| entry.is_fresh(now)))
    }

    async fn get_stale(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.retained(key))
    }

    async fn put(
        &self,
        key: &CacheKey,
        payload: Vec<u8>,
        tags: &BTreeSet<String>,
        ttl: Duration,
    ) -> Result<()> {
        let stored_at = self.clock.now();
        let expires_at = expiry_after(stored_at, ttl)?;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot {
            entry: CacheEntry {
                key: key.clone(),
                payload: Arc::new(payload),
                tags: tags.clone(),
                stored_at,
                expires_at,
            },
            generation,
            retain_for: ttl.saturating_add(self.stale_retention),
        });
        let previous = self.cache.get(key);
        self.cache.insert(key.clone(), slot);
        for tag in tags {
            self.index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone(), generation);
        }
        // Replacement skips the eviction listener; drop the tags the old
        // slot carried and this one does not.
        if let Some(previous) = previous {
            unindex_tags(
                &self.index,
                key,
                previous.generation,
                previous.entry.tags.difference(tags),
            );
        }
        debug!(%key, ttl_secs = ttl.as_secs(), "cache put");
        Ok(())
    }

    async fn invalidate_by_tag(&self, tag: &str) -> Result<u64> {
        let Some((_, keys)) = self.index.remove(tag) else {
            return Ok(0);
        };
        let mut removed = 0;
        for key in keys.keys() {
            let tagged = self
                .cache
                .get(key)
                .is_some_and(|slot| slot.entry.has_tag(tag));
            if tagged {
                self.cache.invalidate(key);
                removed += 1;
            }
        }
        metrics::counter!(telemetry::INVALIDATED_ENTRIES_TOTAL, "store" => "memory")
            .increment(removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogError;
    use crate::cache::ManualClock;

    fn tags(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn retention_window_ends_stale_reads() {
        let clock = Arc::new(ManualClock::new());
        let config = CacheConfig::new().stale_retention(Duration::from_secs(60));
        let store = MemoryStore::with_clock(&config, clock.clone());
        let key = CacheKey::from_raw("popular:{}");

        store
            .put(&key, b"x".to_vec(), &tags(&["popular"]), Duration::from_secs(10))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(30));
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.get_stale(&key).await.unwrap().is_some());

        clock.advance(Duration::from_secs(60));
        assert!(store.get_stale(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rewrite_without_tag_survives_invalidation() {
        let store = MemoryStore::new(&CacheConfig::new());
        let key = CacheKey::from_raw("discover:{}");
        let ttl = Duration::from_secs(60);

        store
            .put(&key, b"old".to_vec(), &tags(&["discover", "genre"]), ttl)
            .await
            .unwrap();
        store
            .put(&key, b"new".to_vec(), &tags(&["discover"]), ttl)
            .await
            .unwrap();

        assert_eq!(store.invalidate_by_tag("genre").await.unwrap(), 0);
        let entry = store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.payload.as_slice(), b"new");
    }

    #[tokio::test]
    async fn rewrite_with_fewer_tags_unindexes_the_dropped_ones() {
        let store = MemoryStore::new(&CacheConfig::new());
        let key = CacheKey::from_raw("detail:{\"movie_id\":550}");
        let ttl = Duration::from_secs(60);

        store
            .put(&key, b"old".to_vec(), &tags(&["detail", "movie:550"]), ttl)
            .await
            .unwrap();
        assert_eq!(store.indexed_tags(), 2);

        store
            .put(&key, b"new".to_vec(), &tags(&["detail"]), ttl)
            .await
            .unwrap();
        assert_eq!(store.indexed_tags(), 1);
        assert_eq!(store.invalidate_by_tag("detail").await.unwrap(), 1);
        assert_eq!(store.indexed_tags(), 0);
    }

    #[tokio::test]
    async fn overflowing_ttl_is_rejected_without_a_write() {
        let store = MemoryStore::new(&CacheConfig::new());
        let key = CacheKey::from_raw("genres:{}");

        let err = store
            .put(&key, b"x".to_vec(), &tags(&["genre"]), Duration::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Cache(_)));
        assert!(store.get_stale(&key).await.unwrap().is_none());
        assert_eq!(store.indexed_tags(), 0);
    }

    #[test]
    fn stale_retention_is_clamped() {
        let config = CacheConfig::new().stale_retention(Duration::MAX);
        assert_eq!(config.stale_retention, MAX_TTL);
    }

    #[tokio::test]
    async fn invalidating_unknown_tag_is_a_noop() {
        let store = MemoryStore::new(&CacheConfig::new());
        assert_eq!(store.invalidate_by_tag("nothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalidation_drops_tag_from_index() {
        let store = MemoryStore::new(&CacheConfig::new());
        let key = CacheKey::from_raw("genres:{}");
        store
            .put(&key, b"x".to_vec(), &tags(&["genre"]), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.indexed_tags(), 1);

        store.invalidate_by_tag("genre").await.unwrap();
        assert_eq!(store.indexed_tags(), 0);
    }
}
