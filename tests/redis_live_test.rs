//! Live Redis store tests.
//!
//! Ignored by default. Run against a scratch Redis with:
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test --features redis --test redis_live_test -- --ignored`

#![cfg(feature = "redis")]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use marquee::cache::{CacheKey, CacheStore, ManualClock, RedisStore};
use marquee::{CatalogRequest, DiscoverFilters};

async fn store() -> (RedisStore, Arc<ManualClock>) {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set for live tests");
    // Unique namespace per run so parallel tests don't collide.
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let clock = Arc::new(ManualClock::new());
    let store = RedisStore::connect(&url, format!("marquee-test-{nanos}"))
        .await
        .expect("Failed to connect to redis")
        .with_clock(clock.clone());
    (store, clock)
}

fn tags_of(request: &CatalogRequest) -> BTreeSet<String> {
    request.tags().into_iter().collect()
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn test_live_put_get_and_expiry() {
    let (store, clock) = store().await;
    let request = CatalogRequest::popular(1);
    let key = CacheKey::for_request(&request);

    store
        .put(&key, b"popular".to_vec(), &tags_of(&request), Duration::from_secs(60))
        .await
        .unwrap();
    let entry = store.get(&key).await.unwrap().unwrap();
    assert_eq!(entry.payload.as_slice(), b"popular");
    assert!(entry.has_tag("popular"));

    clock.advance(Duration::from_secs(61));
    assert!(store.get(&key).await.unwrap().is_none());
    assert!(store.get_stale(&key).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn test_live_tag_invalidation() {
    let (store, _clock) = store().await;
    let ttl = Duration::from_secs(60);

    let genres = CatalogRequest::genres();
    let action = CatalogRequest::discover(DiscoverFilters::new().genre(28), 1);
    let popular = CatalogRequest::popular(1);
    for request in [&genres, &action, &popular] {
        store
            .put(&CacheKey::for_request(request), b"x".to_vec(), &tags_of(request), ttl)
            .await
            .unwrap();
    }

    assert_eq!(store.invalidate_by_tag("genre").await.unwrap(), 2);
    assert!(store.get(&CacheKey::for_request(&genres)).await.unwrap().is_none());
    assert!(store.get(&CacheKey::for_request(&popular)).await.unwrap().is_some());
}
