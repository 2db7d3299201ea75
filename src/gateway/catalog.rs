//! The catalog aggregator: cache lookup, coalesced fetch, normalization,
//! cache population and stale fallback.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheKey, CacheStore, TtlPolicy};
use crate::coalesce::Coalescer;
use crate::normalize::normalize;
use crate::telemetry;
use crate::types::{
    CatalogPayload, CatalogRequest, DiscoverFilters, GENRE_TAG, Genre, MovieDetail,
    MovieSummary, PaginatedEnvelope, TimeWindow, movie_tag,
};
use crate::upstream::CatalogSource;
use crate::{CatalogError, Result};

/// Where a read was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrigin {
    /// A fresh cache entry.
    Cache,
    /// A fetch from the upstream (possibly joined from another caller).
    Upstream,
    /// An expired cache entry, served because the upstream failed transiently.
    Stale,
}

/// Result of a catalog read.
#[derive(Debug, Clone)]
pub struct CatalogRead {
    pub payload: Arc<CatalogPayload>,
    pub origin: ReadOrigin,
}

impl CatalogRead {
    /// Whether this payload is degraded (expired data served on upstream
    /// failure).
    pub fn is_stale(&self) -> bool {
        self.origin == ReadOrigin::Stale
    }

    pub fn movies(&self) -> Option<&PaginatedEnvelope<MovieSummary>> {
        self.payload.as_movies()
    }

    pub fn genres(&self) -> Option<&PaginatedEnvelope<Genre>> {
        self.payload.as_genres()
    }

    pub fn movie(&self) -> Option<&MovieDetail> {
        self.payload.as_movie()
    }
}

/// State shared between the catalog and its spawned fetches.
struct Core {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn CacheStore>,
    ttl: TtlPolicy,
    page_size: u32,
}

impl Core {
    /// Fetch, normalize and cache. Runs inside the coalesced task, so the
    /// cache is populated even when every caller has gone away.
    ///
    /// The cache is checked again first: a previous leader may have filled
    /// it between this caller's miss and its joining the coalescer.
    async fn fetch_and_store(
        &self,
        request: &CatalogRequest,
        key: &CacheKey,
        ttl: Option<Duration>,
    ) -> Result<CatalogRead> {
        if ttl.is_some()
            && let Some(payload) = self.lookup(key).await
        {
            debug!(%key, "cache filled by an earlier fetch");
            return Ok(CatalogRead {
                payload,
                origin: ReadOrigin::Cache,
            });
        }

        let raw = self.source.fetch(request).await?;
        let payload = normalize(request, &raw, self.page_size)?;

        if let Some(ttl) = ttl {
            let tags: BTreeSet<String> = request.tags().into_iter().collect();
            match serde_json::to_vec(&payload) {
                Ok(bytes) => {
                    if let Err(e) = self.store.put(key, bytes, &tags, ttl).await {
                        self.backend_error("put", key, &e);
                    }
                }
                Err(e) => self.backend_error("encode", key, &CatalogError::Cache(e.to_string())),
            }
        }
        Ok(CatalogRead {
            payload: Arc::new(payload),
            origin: ReadOrigin::Upstream,
        })
    }

    fn backend_error(&self, operation: &'static str, key: &CacheKey, err: &CatalogError) {
        let store = self.store.name().to_owned();
        warn!(
            store = %store,
            operation,
            %key,
            error = %err,
            "cache backend error, degrading to direct fetch"
        );
        metrics::counter!(telemetry::CACHE_BACKEND_ERRORS_TOTAL,
            "store" => store,
            "operation" => operation,
        )
        .increment(1);
    }

    fn decode(&self, entry: &CacheEntry) -> Result<Arc<CatalogPayload>> {
        serde_json::from_slice(&entry.payload)
            .map(Arc::new)
            .map_err(|e| CatalogError::Cache(format!("undecodable cached payload: {e}")))
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Arc<CatalogPayload>> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                self.backend_error("get", key, &e);
                return None;
            }
        };
        match self.decode(&entry) {
            Ok(payload) => Some(payload),
            Err(e) => {
                self.backend_error("decode", key, &e);
                None
            }
        }
    }

    async fn lookup_stale(&self, key: &CacheKey) -> Option<Arc<CatalogPayload>> {
        let entry = match self.store.get_stale(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                self.backend_error("get_stale", key, &e);
                return None;
            }
        };
        match self.decode(&entry) {
            Ok(payload) => Some(payload),
            Err(e) => {
                self.backend_error("decode", key, &e);
                None
            }
        }
    }
}

/// Read-through catalog over an upstream source and a cache store.
///
/// Cheap to share behind an `Arc`; every instance owns its own in-flight map,
/// so tests can build isolated catalogs.
pub struct Catalog {
    core: Arc<Core>,
    coalescer: Coalescer<CatalogRead>,
}

impl Catalog {
    /// Assemble a catalog from parts. Most callers want
    /// [`Marquee::builder()`](super::Marquee::builder).
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn CacheStore>,
        ttl: TtlPolicy,
        page_size: u32,
    ) -> Self {
        Self {
            core: Arc::new(Core {
                source,
                store,
                ttl,
                page_size: page_size.max(1),
            }),
            coalescer: Coalescer::new(),
        }
    }

    /// Read one resource.
    ///
    /// 1. A fresh cache entry is returned without touching the upstream.
    /// 2. Otherwise the request joins (or starts) the single in-flight fetch
    ///    for its key; the fetch checks the cache once more, then normalizes
    ///    the upstream response and writes it under the class TTL.
    /// 3. If the fetch fails transiently and an expired entry is still
    ///    retained, that entry is served with [`ReadOrigin::Stale`]. Permanent
    ///    failures always propagate.
    pub async fn read(&self, request: &CatalogRequest) -> Result<CatalogRead> {
        request.validate()?;
        let class = request.class();
        let key = CacheKey::for_request(request);
        let ttl = self.core.ttl.ttl_for(class);

        if ttl.is_some()
            && let Some(payload) = self.core.lookup(&key).await
        {
            debug!(%key, %class, "cache hit");
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "class" => class.as_str()).increment(1);
            return Ok(CatalogRead {
                payload,
                origin: ReadOrigin::Cache,
            });
        }
        debug!(%key, %class, cacheable = ttl.is_some(), "cache miss");
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "class" => class.as_str()).increment(1);

        let core = Arc::clone(&self.core);
        let fetch_request = request.clone();
        let fetch_key = key.clone();
        let outcome = self
            .coalescer
            .get_or_fetch(&key, move || async move {
                core.fetch_and_store(&fetch_request, &fetch_key, ttl).await
            })
            .await;

        match outcome {
            Ok(read) => Ok(read),
            Err(err) if err.is_transient() && ttl.is_some() => {
                let Some(payload) = self.core.lookup_stale(&key).await else {
                    return Err(err);
                };
                warn!(%key, %class, error = %err, "upstream failed, serving stale entry");
                metrics::counter!(telemetry::STALE_SERVED_TOTAL, "class" => class.as_str())
                    .increment(1);
                Ok(CatalogRead {
                    payload,
                    origin: ReadOrigin::Stale,
                })
            }
            Err(err) => Err(err),
        }
    }

    pub async fn trending(&self, window: TimeWindow, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::trending(window, page)).await
    }

    pub async fn popular(&self, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::popular(page)).await
    }

    pub async fn top_rated(&self, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::top_rated(page)).await
    }

    pub async fn now_playing(&self, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::now_playing(page)).await
    }

    pub async fn upcoming(&self, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::upcoming(page)).await
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::search(query, page)).await
    }

    pub async fn discover(&self, filters: DiscoverFilters, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::discover(filters, page)).await
    }

    pub async fn detail(&self, movie_id: u64) -> Result<CatalogRead> {
        self.read(&CatalogRequest::detail(movie_id)).await
    }

    pub async fn recommendations(&self, movie_id: u64, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::recommendations(movie_id, page))
            .await
    }

    pub async fn similar(&self, movie_id: u64, page: u32) -> Result<CatalogRead> {
        self.read(&CatalogRequest::similar(movie_id, page)).await
    }

    pub async fn genres(&self) -> Result<CatalogRead> {
        self.read(&CatalogRequest::genres()).await
    }

    /// Drop every cached entry carrying `tag`. Returns how many were removed.
    ///
    /// Unlike reads, invalidation surfaces backend failures: a caller asking
    /// for fresh data must know it did not happen.
    pub async fn invalidate(&self, tag: &str) -> Result<u64> {
        let removed = self.core.store.invalidate_by_tag(tag).await?;
        info!(tag, removed, "invalidated cache entries");
        Ok(removed)
    }

    /// Drop every cached entry about one movie (detail, recommendations,
    /// similar).
    pub async fn invalidate_movie(&self, movie_id: u64) -> Result<u64> {
        self.invalidate(&movie_tag(movie_id)).await
    }

    /// Drop everything derived from the genre catalog, then reload the genre
    /// list from upstream.
    pub async fn resync_genres(&self) -> Result<CatalogRead> {
        self.invalidate(GENRE_TAG).await?;
        self.genres().await
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.core.store
    }

    pub fn source_name(&self) -> &str {
        self.core.source.name()
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.core.ttl
    }

    pub fn page_size(&self) -> u32 {
        self.core.page_size
    }

    /// Number of keys with an upstream fetch currently in flight.
    pub fn inflight_count(&self) -> usize {
        self.coalescer.inflight_count()
    }
}
