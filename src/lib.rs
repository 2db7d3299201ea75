//! Marquee - cache-aside catalog layer for the TMDb movie API
//!
//! This crate fronts a rate-limited movie catalog with a read-through cache.
//! Every read is answered from a fresh cache entry when possible; concurrent
//! misses for the same request share a single upstream fetch; responses are
//! normalized into one paginated envelope; and when the upstream fails
//! transiently, recently expired entries are served as stale fallback.
//!
//! # Example
//!
//! ```rust,no_run
//! use marquee::{Marquee, TimeWindow};
//!
//! #[tokio::main]
//! async fn main() -> marquee::Result<()> {
//!     let catalog = Marquee::builder()
//!         .tmdb("your-tmdb-api-key")
//!         .build()?;
//!
//!     let read = catalog.trending(TimeWindow::Day, 1).await?;
//!     if let Some(page) = read.movies() {
//!         for movie in &page.results {
//!             println!("{} ({})", movie.title, movie.release_date);
//!         }
//!     }
//!
//!     // An admin edited movie 550: drop everything cached about it.
//!     catalog.invalidate_movie(550).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Shared cache (requires `redis` feature)
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marquee::Marquee;
//! use marquee::cache::RedisStore;
//!
//! let store = RedisStore::connect("redis://127.0.0.1:6379", "marquee").await?;
//! let catalog = Marquee::builder()
//!     .tmdb("your-tmdb-api-key")
//!     .cache_store(Arc::new(store))
//!     .build()?;
//! ```

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod telemetry;
pub mod types;
pub mod upstream;

// Re-export main types at crate root
pub use error::{CatalogError, ErrorClass, Result};
pub use gateway::{Catalog, CatalogRead, Marquee, MarqueeBuilder, ReadOrigin};
pub use upstream::{CatalogSource, RetryConfig, TmdbClient};

pub use types::{
    CastMember, CatalogPayload, CatalogRequest, CrewMember, DiscoverFilters, Genre, MovieDetail,
    MovieSummary, PaginatedEnvelope, RawResponse, ResourceClass, TimeWindow, Video,
};
