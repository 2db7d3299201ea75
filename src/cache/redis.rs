//! Redis-backed cache store.
//!
//! Layout under a namespace `ns`:
//!
//! | Key              | Type | Contents                                         |
//! |------------------|------|--------------------------------------------------|
//! | `ns:entry:{key}` | hash | `payload`, `stored_at`, `expires_at`, `tags`     |
//! | `ns:tag:{tag}`   | set  | cache keys written with `tag`                    |
//!
//! Entry hashes get a `PEXPIRE` of `ttl + stale_retention`, so Redis drops them
//! once stale fallback is no longer allowed. Tag sets get a long fixed expiry
//! that is refreshed on every write. A tag set may reference keys that were
//! since rewritten without the tag; invalidation deletes them anyway.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

use super::store::expiry_after;
use super::{CacheEntry, CacheKey, CacheStore, Clock, MAX_TTL, SystemClock};
use crate::telemetry;
use crate::{CatalogError, Result};

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "marquee";

/// Expiry applied to tag sets, refreshed on every write.
const TAG_SET_TTL: Duration = Duration::from_secs(31 * 24 * 3600);

fn backend(err: redis::RedisError) -> CatalogError {
    CatalogError::Cache(format!("redis: {err}"))
}

fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// [`CacheStore`] shared across processes through Redis.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    namespace: String,
    stale_retention: Duration,
    clock: Arc<dyn Clock>,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`) under `namespace`.
    pub async fn connect(url: &str, namespace: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = client.get_connection_manager().await.map_err(backend)?;
        Ok(Self {
            conn,
            namespace: namespace.into(),
            stale_retention: Duration::from_secs(24 * 3600),
            clock: Arc::new(SystemClock),
        })
    }

    /// How long expired entries remain readable for stale fallback.
    pub fn stale_retention(mut self, retention: Duration) -> Self {
        self.stale_retention = retention.min(MAX_TTL);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn entry_key(&self, key: &CacheKey) -> String {
        entry_key(&self.namespace, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        tag_key(&self.namespace, tag)
    }

    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, Vec<u8>> =
            conn.hgetall(self.entry_key(key)).await.map_err(backend)?;
        let Some(entry) = parse_entry(key, fields)? else {
            return Ok(None);
        };
        if !entry.is_retained(self.clock.now(), self.stale_retention) {
            return Ok(None);
        }
        Ok(Some(entry))
    }
}

fn entry_key(namespace: &str, key: &CacheKey) -> String {
    format!("{namespace}:entry:{key}")
}

fn tag_key(namespace: &str, tag: &str) -> String {
    format!("{namespace}:tag:{tag}")
}

/// Decode an entry hash. An empty hash means the key does not exist.
fn parse_entry(key: &CacheKey, mut fields: HashMap<String, Vec<u8>>) -> Result<Option<CacheEntry>> {
    if fields.is_empty() {
        return Ok(None);
    }
    let mut take = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| CatalogError::Cache(format!("entry {key} is missing field '{name}'")))
    };
    let payload = take("payload")?;
    let stored_at = parse_millis(key, &take("stored_at")?)?;
    let expires_at = parse_millis(key, &take("expires_at")?)?;
    let tags: BTreeSet<String> = serde_json::from_slice(&take("tags")?)
        .map_err(|e| CatalogError::Cache(format!("entry {key} has unreadable tags: {e}")))?;
    Ok(Some(CacheEntry {
        key: key.clone(),
        payload: Arc::new(payload),
        tags,
        stored_at,
        expires_at,
    }))
}

fn parse_millis(key: &CacheKey, raw: &[u8]) -> Result<SystemTime> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|ms| UNIX_EPOCH + Duration::from_millis(ms))
        .ok_or_else(|| CatalogError::Cache(format!("entry {key} has an unreadable timestamp")))
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let now = self.clock.now();
        Ok(self.load(key).await?.filter(|entry| entry.is_fresh(now)))
    }

    async fn get_stale(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.load(key).await
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
        let retain_for = ttl.saturating_add(self.stale_retention);
        let entry_key = self.entry_key(key);
        let tags_json = serde_json::to_string(tags)
            .map_err(|e| CatalogError::Cache(format!("cannot encode tags: {e}")))?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(&entry_key)
            .arg("payload")
            .arg(payload)
            .arg("stored_at")
            .arg(epoch_millis(stored_at))
            .arg("expires_at")
            .arg(epoch_millis(expires_at))
            .arg("tags")
            .arg(tags_json)
            .ignore()
            .pexpire(&entry_key, retain_for.as_millis() as i64)
            .ignore();
        for tag in tags {
            let tag_key = self.tag_key(tag);
            pipe.sadd(&tag_key, key.as_str())
                .ignore()
                .expire(&tag_key, TAG_SET_TTL.as_secs() as i64)
                .ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(backend)?;
        debug!(%key, ttl_secs = ttl.as_secs(), "redis cache put");
        Ok(())
    }

    async fn invalidate_by_tag(&self, tag: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let tag_key = self.tag_key(tag);
        let members: Vec<String> = conn.smembers(&tag_key).await.map_err(backend)?;

        let entry_keys: Vec<String> = members
            .into_iter()
            .map(|raw| self.entry_key(&CacheKey::from_raw(raw)))
            .collect();

        let removed = if entry_keys.is_empty() {
            let _: () = conn.del(&tag_key).await.map_err(backend)?;
            0
        } else {
            let (removed,): (u64,) = redis::pipe()
                .atomic()
                .del(&entry_keys)
                .del(&tag_key)
                .ignore()
                .query_async(&mut conn)
                .await
                .map_err(backend)?;
            removed
        };

        metrics::counter!(telemetry::INVALIDATED_ENTRIES_TOTAL, "store" => "redis")
            .increment(removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &[u8])]) -> HashMap<String, Vec<u8>> {
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_vec()))
            .collect()
    }

    #[test]
    fn key_layout() {
        let key = CacheKey::from_raw(r#"detail:{"movie_id":"550"}"#);
        assert_eq!(
            entry_key("marquee", &key),
            r#"marquee:entry:detail:{"movie_id":"550"}"#
        );
        assert_eq!(tag_key("marquee", "movie:550"), "marquee:tag:movie:550");
    }

    #[test]
    fn empty_hash_is_absent() {
        let key = CacheKey::from_raw("k");
        assert!(parse_entry(&key, HashMap::new()).unwrap().is_none());
    }

    #[test]
    fn parses_full_record() {
        let key = CacheKey::from_raw("k");
        let fields = record(&[
            ("payload", b"{}"),
            ("stored_at", b"1000"),
            ("expires_at", b"61000"),
            ("tags", br#"["genre","genres"]"#),
        ]);
        let entry = parse_entry(&key, fields).unwrap().unwrap();
        assert_eq!(entry.payload.as_slice(), b"{}");
        assert_eq!(entry.stored_at, UNIX_EPOCH + Duration::from_secs(1));
        assert_eq!(entry.expires_at, UNIX_EPOCH + Duration::from_secs(61));
        assert!(entry.has_tag("genre"));
    }

    #[test]
    fn partial_record_is_a_backend_error() {
        let key = CacheKey::from_raw("k");
        let fields = record(&[("payload", b"{}")]);
        let err = parse_entry(&key, fields).unwrap_err();
        assert!(matches!(err, CatalogError::Cache(_)));
    }
}
