//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `marquee_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `class`: resource class (e.g. "trending", "detail")
//! - `source`: upstream source name (e.g. "tmdb")
//! - `status`: outcome, "ok" or the error kind (e.g. "timeout")
//! - `store`: cache store name ("memory" | "redis")

/// Upstream attempts, including retries.
///
/// Labels: `source`, `class`, `status`.
pub const UPSTREAM_REQUESTS_TOTAL: &str = "marquee_upstream_requests_total";

/// Upstream attempt duration in seconds.
///
/// Labels: `source`, `class`.
pub const UPSTREAM_REQUEST_DURATION_SECONDS: &str = "marquee_upstream_request_duration_seconds";

/// Retry attempts (not counting the initial request).
///
/// Labels: `source`, `class`.
pub const RETRIES_TOTAL: &str = "marquee_retries_total";

/// Fresh cache hits.
///
/// Labels: `class`.
pub const CACHE_HITS_TOTAL: &str = "marquee_cache_hits_total";

/// Cache misses (absent, expired, or unreadable entries).
///
/// Labels: `class`.
pub const CACHE_MISSES_TOTAL: &str = "marquee_cache_misses_total";

/// Expired entries served after a transient upstream failure.
///
/// Labels: `class`.
pub const STALE_SERVED_TOTAL: &str = "marquee_stale_served_total";

/// Callers that joined an in-flight fetch instead of starting one.
pub const COALESCED_WAITERS_TOTAL: &str = "marquee_coalesced_waiters_total";

/// Cache backend failures that were degraded to a direct fetch.
///
/// Labels: `store`, `operation`.
pub const CACHE_BACKEND_ERRORS_TOTAL: &str = "marquee_cache_backend_errors_total";

/// Entries removed by tag invalidation.
///
/// Labels: `store`.
pub const INVALIDATED_ENTRIES_TOTAL: &str = "marquee_invalidated_entries_total";
