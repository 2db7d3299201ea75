//! Caching subsystem.
//!
//! - [`CacheStore`]: the storage contract. Entries carry an expiry instant
//!   and a set of invalidation tags; expired entries stay readable for a
//!   stale retention window.
//!
//! - [`MemoryStore`]: in-process store on a bounded moka cache. The default.
//!
//! - `RedisStore` (feature `redis`): networked store shared by every process
//!   pointing at the same Redis namespace.
//!
//! - [`TtlPolicy`]: per-class expiry. A class with no TTL is never cached.
//!
//! - [`CacheKey`]: canonical key derived from a request's class and
//!   identifying parameters.
//!
//! Time flows through [`Clock`] so expiry can be tested without sleeping.

mod clock;
mod key;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod store;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{CacheKey, MAX_KEY_LEN};
pub use memory::{CacheConfig, MemoryStore};
#[cfg(feature = "redis")]
pub use redis::{DEFAULT_NAMESPACE, RedisStore};
pub use store::{CacheEntry, CacheStore};
pub use ttl::{MAX_TTL, TtlPolicy, default_ttl};
