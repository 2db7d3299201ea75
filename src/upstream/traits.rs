//! Upstream source seam.
//!
//! Anything that can answer a [`CatalogRequest`] with a raw upstream shape
//! implements [`CatalogSource`]: the TMDb HTTP client, the retry decorator,
//! and test doubles.
//!
//! # Error contract
//!
//! Sources classify their failures once, as [`CatalogError`](crate::CatalogError)
//! variants. Transient variants (`Timeout`, `RateLimited`,
//! `UpstreamUnavailable`) may be retried by a decorator; everything else is
//! final.

use async_trait::async_trait;

use crate::Result;
use crate::types::{CatalogRequest, RawResponse};

/// A source of raw catalog data.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Source name for logging and metrics.
    fn name(&self) -> &str;

    /// Fetch the raw response for a validated request.
    async fn fetch(&self, request: &CatalogRequest) -> Result<RawResponse>;
}
