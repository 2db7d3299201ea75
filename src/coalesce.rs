//! Request coalescing: at most one in-flight fetch per cache key.
//!
//! The first caller for a key becomes the leader and its fetch runs on a
//! spawned task. Later callers for the same key subscribe to that task's
//! outcome instead of starting their own. Everyone receives the same success
//! value or the same error.
//!
//! The spawned task removes its own in-flight record when it settles or
//! panics, matched by record id so it never removes a successor's record. A
//! panic reaches every waiter as [`CatalogError::Internal`]. Because the fetch
//! does not live inside any caller's future, dropping a waiter (including the
//! leader) never cancels the fetch or strands the other waiters.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::debug;

use crate::cache::CacheKey;
use crate::telemetry;
use crate::{CatalogError, Result};

type SharedOutcome<T> = Shared<BoxFuture<'static, Result<T>>>;

struct InFlight<T: Clone> {
    id: u64,
    outcome: SharedOutcome<T>,
}

/// Removes the in-flight record when the fetch task finishes, including by
/// panic.
struct Settle<T: Clone> {
    inflight: Arc<DashMap<CacheKey, InFlight<T>>>,
    key: CacheKey,
    id: u64,
}

impl<T: Clone> Drop for Settle<T> {
    fn drop(&mut self) {
        self.inflight.remove_if(&self.key, |_, record| record.id == self.id);
    }
}

/// Deduplicates concurrent fetches by key.
pub struct Coalescer<T: Clone> {
    inflight: Arc<DashMap<CacheKey, InFlight<T>>>,
    next_id: AtomicU64,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the in-flight fetch for `key`, or start one with `fetch`.
    ///
    /// `fetch` is only invoked by the leader, and only to build the future;
    /// it runs while the key's slot is locked, so it must not block.
    pub async fn get_or_fetch<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let outcome = match self.inflight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                metrics::counter!(telemetry::COALESCED_WAITERS_TOTAL).increment(1);
                debug!(%key, "joining in-flight fetch");
                entry.get().outcome.clone()
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let outcome = self.spawn(key.clone(), id, fetch());
                entry.insert(InFlight {
                    id,
                    outcome: outcome.clone(),
                });
                outcome
            }
        };
        outcome.await
    }

    fn spawn<Fut>(&self, key: CacheKey, id: u64, fut: Fut) -> SharedOutcome<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let settle = Settle {
            inflight: Arc::clone(&self.inflight),
            key,
            id,
        };
        let handle = tokio::spawn(async move {
            let _settle = settle;
            fut.await
        });
        async move {
            handle.await.unwrap_or_else(|e| {
                Err(CatalogError::Internal(format!("fetch task failed: {e}")))
            })
        }
        .boxed()
        .shared()
    }

    /// Number of keys with a fetch currently in flight.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_inflight(&self, key: &CacheKey) -> bool {
        self.inflight.contains_key(key)
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
