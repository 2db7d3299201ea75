//! Retry configuration, the retry state machine, and the retrying source
//! decorator.
//!
//! Retrying is driven by [`RetryState`]:
//!
//! ```text
//! Attempting(n) --ok--------------------------------------> Succeeded
//! Attempting(n) --timeout/5xx/rate-limit, n+1 < max-------> Attempting(n+1)
//! Attempting(n) --timeout/5xx/rate-limit, budget spent----> FailedTransient
//! Attempting(n) --4xx/malformed/auth----------------------> FailedPermanent
//! ```
//!
//! The budget is spent when attempts run out, or when the upstream asks us to
//! wait longer than `max_delay`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;

use super::traits::CatalogSource;
use crate::telemetry;
use crate::types::{CatalogRequest, RawResponse};
use crate::{CatalogError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Exponential backoff without jitter:
///
/// ```rust
/// # use marquee::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(2), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff before retry number `attempt + 1` (0-indexed):
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Backoff respecting an upstream `retry-after` hint, which replaces the
    /// computed delay.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// Where a retried call stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `n` (0-indexed) is about to run or has just run.
    Attempting(u32),
    Succeeded,
    FailedTransient,
    FailedPermanent,
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Attempting(_))
    }

    /// Transition after the current attempt finished. `error` is `None` on
    /// success. Terminal states stay put.
    pub fn next(self, config: &RetryConfig, error: Option<&CatalogError>) -> RetryState {
        let RetryState::Attempting(n) = self else {
            return self;
        };
        match error {
            None => RetryState::Succeeded,
            Some(e) if !e.is_transient() => RetryState::FailedPermanent,
            Some(_) if n + 1 >= config.max_attempts.max(1) => RetryState::FailedTransient,
            Some(e) if e.retry_after().is_some_and(|hint| hint > config.max_delay) => {
                RetryState::FailedTransient
            }
            Some(_) => RetryState::Attempting(n + 1),
        }
    }
}

/// Execute an async operation under the retry state machine.
///
/// Permanent errors are returned immediately without retry. Transient errors
/// are retried with backoff until the budget is spent, then the last error
/// is returned.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    source: &str,
    class: &'static str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let err = match f().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match RetryState::Attempting(attempt).next(config, Some(&err)) {
            RetryState::Attempting(next) => {
                let delay = config.effective_delay(attempt, err.retry_after());
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "source" => source.to_owned(),
                    "class" => class,
                )
                .increment(1);
                warn!(
                    source,
                    class,
                    attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt = next;
            }
            RetryState::FailedTransient if attempt + 1 < config.max_attempts => {
                warn!(
                    source,
                    class,
                    retry_after = ?err.retry_after(),
                    max_delay_ms = config.max_delay.as_millis() as u64,
                    "upstream asked to wait longer than max delay, giving up"
                );
                return Err(err);
            }
            _ => return Err(err),
        }
    }
}

/// Decorator that wraps a [`CatalogSource`] with retry logic and per-attempt
/// metrics.
pub struct RetryingSource {
    inner: Arc<dyn CatalogSource>,
    config: RetryConfig,
}

impl RetryingSource {
    pub fn new(inner: Arc<dyn CatalogSource>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

fn record_attempt(source: &str, class: &'static str, start: Instant, result: &Result<RawResponse>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
        "source" => source.to_owned(),
        "class" => class,
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::UPSTREAM_REQUEST_DURATION_SECONDS,
        "source" => source.to_owned(),
        "class" => class,
    )
    .record(start.elapsed().as_secs_f64());
}

#[async_trait]
impl CatalogSource for RetryingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, request: &CatalogRequest) -> Result<RawResponse> {
        let inner = &self.inner;
        let source = inner.name();
        let class = request.class().as_str();
        with_retry(&self.config, source, class, || async move {
            let start = Instant::now();
            let result = inner.fetch(request).await;
            record_attempt(source, class, start, &result);
            result
        })
        .await
    }
}
