//! Builder for configuring catalog instances

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::Catalog;
use crate::cache::{CacheConfig, CacheStore, Clock, MemoryStore, SystemClock, TtlPolicy};
use crate::normalize::DEFAULT_PAGE_SIZE;
use crate::types::ResourceClass;
use crate::upstream::{
    CatalogSource, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, RetryConfig, RetryingSource, TmdbClient,
};
use crate::{CatalogError, Result};

/// Main entry point for creating catalog instances.
pub struct Marquee;

impl Marquee {
    /// Create a new builder for configuring the catalog.
    pub fn builder() -> MarqueeBuilder {
        MarqueeBuilder::new()
    }
}

/// Builder for configuring catalog instances.
pub struct MarqueeBuilder {
    tmdb_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    retry: RetryConfig,
    page_size: u32,
    ttl_policy: TtlPolicy,
    cache_config: CacheConfig,
    cache_store: Option<Arc<dyn CacheStore>>,
    source: Option<Arc<dyn CatalogSource>>,
    clock: Arc<dyn Clock>,
}

impl MarqueeBuilder {
    pub fn new() -> Self {
        Self {
            tmdb_key: None,
            base_url: None,
            timeout: None,
            retry: RetryConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            ttl_policy: TtlPolicy::default(),
            cache_config: CacheConfig::default(),
            cache_store: None,
            source: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use the TMDb API with the given key.
    pub fn tmdb(mut self, api_key: impl Into<String>) -> Self {
        self.tmdb_key = Some(api_key.into());
        self
    }

    /// Override the TMDb base URL (for a proxy, or wiremock in tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the per-request upstream timeout (default: 10s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient upstream failures.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Disable retries: a single upstream attempt per fetch.
    pub fn disable_retry(mut self) -> Self {
        self.retry = RetryConfig::disabled();
        self
    }

    /// Maximum results per page in normalized envelopes (default: 20).
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Replace the whole TTL policy.
    pub fn ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Override the TTL of one class. Zero stops caching that class.
    pub fn ttl(mut self, class: ResourceClass, ttl: Duration) -> Self {
        self.ttl_policy = self.ttl_policy.with_ttl(class, ttl);
        self
    }

    /// Configure the default in-memory store. Ignored when a custom store is
    /// set with [`cache_store`](Self::cache_store).
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Use a custom cache store (e.g. a shared `RedisStore`).
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Use a custom upstream source instead of the TMDb client. Still wrapped
    /// with the retry policy.
    pub fn source(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Clock for the default in-memory store.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the catalog.
    pub fn build(self) -> Result<Catalog> {
        if self.page_size == 0 {
            return Err(CatalogError::Configuration(
                "page size must be at least 1".to_string(),
            ));
        }

        let source: Arc<dyn CatalogSource> = match (self.source, self.tmdb_key) {
            (Some(source), _) => source,
            (None, Some(key)) => Arc::new(TmdbClient::with_base_url(
                key,
                self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
                self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            )?),
            (None, None) => {
                return Err(CatalogError::Configuration(
                    "no catalog source configured: set a TMDb API key or a custom source"
                        .to_string(),
                ));
            }
        };
        let source = Arc::new(RetryingSource::new(source, self.retry));

        let store: Arc<dyn CacheStore> = self
            .cache_store
            .unwrap_or_else(|| Arc::new(MemoryStore::with_clock(&self.cache_config, self.clock)));

        info!(
            source = source.name(),
            store = store.name(),
            max_attempts = source.config().max_attempts,
            page_size = self.page_size,
            "catalog ready"
        );

        Ok(Catalog::new(source, store, self.ttl_policy, self.page_size))
    }
}

impl Default for MarqueeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
