//! Cache store contract.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use super::CacheKey;
use crate::{CatalogError, Result};

/// One cached response. Immutable once written; a refresh overwrites the
/// whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// Serialized [`CatalogPayload`](crate::CatalogPayload), opaque to the store.
    pub payload: Arc<Vec<u8>>,
    pub tags: BTreeSet<String>,
    pub stored_at: SystemTime,
    pub expires_at: SystemTime,
}

impl CacheEntry {
    /// Fresh iff `now < expires_at`; an entry is already expired at exactly
    /// `stored_at + ttl`.
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }

    /// Whether an expired entry is still inside its stale retention window.
    pub fn is_retained(&self, now: SystemTime, retention: Duration) -> bool {
        self.expires_at
            .checked_add(retention)
            .is_none_or(|discard_at| now < discard_at)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Time since expiry, zero while fresh.
    pub fn staleness(&self, now: SystemTime) -> Duration {
        now.duration_since(self.expires_at).unwrap_or_default()
    }
}

/// Expiry instant for an entry written at `stored_at` with `ttl`.
pub(crate) fn expiry_after(stored_at: SystemTime, ttl: Duration) -> Result<SystemTime> {
    stored_at
        .checked_add(ttl)
        .ok_or_else(|| CatalogError::Cache(format!("ttl of {ttl:?} overflows the clock")))
}

/// Key-value store with per-entry expiry and tag-based invalidation.
///
/// Implementations must be safe under concurrent use without external
/// locking, and must never call the upstream catalog. `put` is
/// last-writer-wins.
///
/// Expired entries stay readable through [`get_stale`](Self::get_stale) for a
/// retention window so the catalog can fall back on them when the upstream
/// is down.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name for logging and metrics.
    fn name(&self) -> &str;

    /// Fresh entry for `key`, or `None` when absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Entry for `key` whether fresh or expired, while still retained.
    async fn get_stale(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Write (or overwrite) the entry for `key`.
    async fn put(
        &self,
        key: &CacheKey,
        payload: Vec<u8>,
        tags: &BTreeSet<String>,
        ttl: Duration,
    ) -> Result<()>;

    /// Remove every entry carrying `tag`. Returns how many were removed.
    async fn invalidate_by_tag(&self, tag: &str) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(expires_in: Duration) -> (CacheEntry, SystemTime) {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        let entry = CacheEntry {
            key: CacheKey::from_raw("k"),
            payload: Arc::new(vec![]),
            tags: BTreeSet::from(["genre".to_string()]),
            stored_at: now,
            expires_at: now + expires_in,
        };
        (entry, now)
    }

    #[test]
    fn fresh_until_expiry_instant() {
        let (entry, now) = entry(Duration::from_secs(10));
        assert!(entry.is_fresh(now + Duration::from_secs(9)));
        assert!(!entry.is_fresh(now + Duration::from_secs(10)));
    }

    #[test]
    fn retention_window_is_exclusive() {
        let (entry, now) = entry(Duration::from_secs(10));
        let retention = Duration::from_secs(60);
        assert!(entry.is_retained(now + Duration::from_secs(69), retention));
        assert!(!entry.is_retained(now + Duration::from_secs(70), retention));
        assert!(entry.is_retained(now, Duration::MAX));
    }

    #[test]
    fn overflowing_ttl_is_a_cache_error() {
        let now = SystemTime::now();
        assert!(matches!(
            expiry_after(now, Duration::MAX),
            Err(CatalogError::Cache(_))
        ));
        assert_eq!(
            expiry_after(now, Duration::from_secs(5)).unwrap(),
            now + Duration::from_secs(5)
        );
    }

    #[test]
    fn staleness_counts_from_expiry() {
        let (entry, now) = entry(Duration::from_secs(10));
        assert_eq!(entry.staleness(now), Duration::ZERO);
        assert_eq!(
            entry.staleness(now + Duration::from_secs(25)),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn tag_lookup() {
        let (entry, _) = entry(Duration::from_secs(1));
        assert!(entry.has_tag("genre"));
        assert!(!entry.has_tag("movie:1"));
    }
}
