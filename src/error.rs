//! Marquee error types

use std::time::Duration;

/// Coarse error classes that drive retry and stale-fallback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeout, 5xx, rate limiting. Retried, then eligible for stale fallback.
    UpstreamTransient,
    /// Not found, malformed payload, bad credentials, other 4xx. Never retried,
    /// never masked by stale data.
    UpstreamPermanent,
    /// The cache backend failed. Reads degrade to a direct fetch.
    CacheBackend,
    /// The request was rejected before touching the cache or the upstream.
    Request,
    /// A local fault, such as a fetch task that panicked. Never retried,
    /// never masked by stale data.
    Internal,
}

/// Marquee error types.
///
/// `Clone` so a single outcome can be handed to every waiter of a coalesced
/// fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    // Upstream, transient
    #[error("upstream request timed out")]
    Timeout,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    // Upstream, permanent
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("upstream rejected credentials")]
    Unauthorized,

    #[error("upstream rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    // Caller errors
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Local infrastructure
    #[error("cache backend error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Classify this error. Classification happens once, at the upstream
    /// client boundary, and is never revised by higher layers.
    pub fn class(&self) -> ErrorClass {
        match self {
            CatalogError::Timeout
            | CatalogError::RateLimited { .. }
            | CatalogError::UpstreamUnavailable(_) => ErrorClass::UpstreamTransient,
            CatalogError::NotFound(_)
            | CatalogError::MalformedResponse(_)
            | CatalogError::Unauthorized
            | CatalogError::Rejected { .. } => ErrorClass::UpstreamPermanent,
            CatalogError::Cache(_) => ErrorClass::CacheBackend,
            CatalogError::InvalidRequest(_) | CatalogError::Configuration(_) => {
                ErrorClass::Request
            }
            CatalogError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether retrying the same upstream call may succeed.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::UpstreamTransient
    }

    /// Whether the caller may retry the whole read later.
    ///
    /// Set on transient upstream failures that had no stale entry to fall
    /// back on.
    pub fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    /// Short stable name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Timeout => "timeout",
            CatalogError::RateLimited { .. } => "rate_limited",
            CatalogError::UpstreamUnavailable(_) => "unavailable",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::MalformedResponse(_) => "malformed",
            CatalogError::Unauthorized => "unauthorized",
            CatalogError::Rejected { .. } => "rejected",
            CatalogError::InvalidRequest(_) => "invalid_request",
            CatalogError::Cache(_) => "cache",
            CatalogError::Configuration(_) => "configuration",
            CatalogError::Internal(_) => "internal",
        }
    }

    /// Upstream `retry-after` hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CatalogError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status a transport layer should surface for this error.
    pub fn suggested_status(&self) -> u16 {
        match self {
            CatalogError::Timeout => 504,
            CatalogError::RateLimited { .. } => 503,
            CatalogError::UpstreamUnavailable(_) => 502,
            CatalogError::NotFound(_) => 404,
            CatalogError::MalformedResponse(_)
            | CatalogError::Unauthorized
            | CatalogError::Rejected { .. } => 502,
            CatalogError::InvalidRequest(_) => 400,
            CatalogError::Cache(_)
            | CatalogError::Configuration(_)
            | CatalogError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for Marquee operations
pub type Result<T> = std::result::Result<T, CatalogError>;
