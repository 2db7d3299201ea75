//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.marquee/config.toml` (user)
//! 3. `/etc/marquee/config.toml` (system)
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.marquee/secrets.toml` (user, must be 0600)
//! 2. `/etc/marquee/secrets.toml` (system, must be 0600)
//!
//! ```toml
//! [upstream]
//! base_url = "https://api.themoviedb.org/3"
//! timeout_secs = 5
//!
//! [retry]
//! max_attempts = 3
//!
//! [cache]
//! backend = "memory"
//! stale_retention_secs = 86400
//!
//! [cache.ttl]
//! trending = 3600
//! search = 0        # never cache searches
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::cache::{CacheConfig, MAX_TTL, TtlPolicy};
use crate::gateway::{Catalog, Marquee, MarqueeBuilder};
use crate::normalize::DEFAULT_PAGE_SIZE;
use crate::upstream::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, RetryConfig};
use crate::{CatalogError, Result};

/// Environment variable consulted when no secrets file provides a key.
pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

/// Catalog configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Upstream API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// TMDb base URL (default: https://api.themoviedb.org/3).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Results per normalized page (default: 20).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Retry settings for transient upstream failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Which cache store to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// Cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Capacity of the in-memory store (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// How long expired entries stay available for stale fallback
    /// (default: 24 hours).
    #[serde(default = "default_stale_retention_secs")]
    pub stale_retention_secs: u64,
    /// Redis URL, required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Redis key namespace (default: "marquee").
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Per-class TTL overrides in seconds. Zero disables caching for a class.
    #[serde(default)]
    pub ttl: BTreeMap<String, u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            max_entries: default_max_entries(),
            stale_retention_secs: default_stale_retention_secs(),
            redis_url: None,
            namespace: default_namespace(),
            ttl: BTreeMap::new(),
        }
    }
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_stale_retention_secs() -> u64 {
    24 * 3600
}

fn default_namespace() -> String {
    "marquee".to_string()
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub tmdb: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.marquee/config.toml`
    /// 3. `/etc/marquee/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?.ok_or_else(|| {
            CatalogError::Configuration(
                "No config file found. Create ~/.marquee/config.toml or /etc/marquee/config.toml"
                    .to_string(),
            )
        })?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but falls back to defaults when no config
    /// file exists. An explicit path that does not exist is still an error.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CatalogError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            CatalogError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, on the first cache write.
    pub fn validate(&self) -> Result<()> {
        self.ttl_policy()?;
        if self.cache.stale_retention_secs > MAX_TTL.as_secs() {
            return Err(CatalogError::Configuration(format!(
                "cache.stale_retention_secs is {}, the maximum is {}",
                self.cache.stale_retention_secs,
                MAX_TTL.as_secs()
            )));
        }
        Ok(())
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CatalogError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".marquee").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/marquee/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// TTL policy with `[cache.ttl]` overrides applied.
    pub fn ttl_policy(&self) -> Result<TtlPolicy> {
        TtlPolicy::from_overrides(&self.cache.ttl)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.retry.max_attempts)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache.max_entries)
            .stale_retention(Duration::from_secs(self.cache.stale_retention_secs))
    }

    /// A builder carrying every setting except the cache backend.
    pub fn builder(&self, secrets: &Secrets) -> Result<MarqueeBuilder> {
        let api_key = secrets.api_key().ok_or_else(|| {
            CatalogError::Configuration(format!(
                "No TMDb API key: add [tmdb] api_key to secrets.toml or set {TMDB_API_KEY_ENV}"
            ))
        })?;
        Ok(Marquee::builder()
            .tmdb(api_key)
            .base_url(self.upstream.base_url.clone())
            .timeout(Duration::from_secs(self.upstream.timeout_secs))
            .page_size(self.upstream.page_size)
            .retry(self.retry_config())
            .ttl_policy(self.ttl_policy()?)
            .cache_config(self.cache_config()))
    }

    /// Build a catalog, connecting to Redis when configured.
    pub async fn build_catalog(&self, secrets: &Secrets) -> Result<Catalog> {
        let builder = self.builder(secrets)?;
        let builder = match self.cache.backend {
            CacheBackend::Memory => builder,
            CacheBackend::Redis => builder.cache_store(self.connect_redis().await?),
        };
        builder.build()
    }

    #[cfg(feature = "redis")]
    async fn connect_redis(&self) -> Result<Arc<dyn crate::cache::CacheStore>> {
        let url = self.cache.redis_url.as_deref().ok_or_else(|| {
            CatalogError::Configuration("cache.backend = \"redis\" requires cache.redis_url".into())
        })?;
        let store = crate::cache::RedisStore::connect(url, self.cache.namespace.clone())
            .await?
            .stale_retention(Duration::from_secs(self.cache.stale_retention_secs));
        info!(namespace = %self.cache.namespace, "connected to redis cache");
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "redis"))]
    async fn connect_redis(&self) -> Result<Arc<dyn crate::cache::CacheStore>> {
        info!(namespace = %self.cache.namespace, "redis cache requested");
        Err(CatalogError::Configuration(
            "cache.backend = \"redis\" requires building with the `redis` feature".to_string(),
        ))
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.marquee/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/marquee/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (the key may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".marquee").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/marquee/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a specific secrets file, enforcing permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            CatalogError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CatalogError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            CatalogError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(CatalogError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// TMDb API key, falling back to `TMDB_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.tmdb
            .as_ref()
            .map(|s| s.api_key.clone())
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(TMDB_API_KEY_ENV).ok())
    }
}
