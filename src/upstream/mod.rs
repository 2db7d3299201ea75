//! Upstream catalog access.
//!
//! [`TmdbClient`] talks HTTP and classifies failures; [`RetryingSource`]
//! adds backoff and per-attempt metrics around any [`CatalogSource`].

mod retry;
mod tmdb;
mod traits;

pub use retry::{RetryConfig, RetryState, RetryingSource};
pub use tmdb::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, TmdbClient};
pub use traits::CatalogSource;
