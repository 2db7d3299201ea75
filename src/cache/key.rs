//! Deterministic cache keys.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::{CatalogRequest, ResourceClass};

/// Keys longer than this are replaced by a digest.
pub const MAX_KEY_LEN: usize = 200;

/// Cache key for one logical catalog request.
///
/// Format: `<class>:<params>` where `<params>` is a JSON object with sorted
/// keys, e.g. `trending:{"page":"1","time_window":"day"}`. JSON string
/// escaping keeps the encoding injective; the format contains nothing
/// process-specific, so keys stay valid across restarts and processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a class and its identifying parameters.
    pub fn new(class: ResourceClass, params: &BTreeMap<&str, String>) -> Self {
        let object: serde_json::Map<String, serde_json::Value> = params
            .iter()
            .map(|(name, value)| ((*name).to_string(), serde_json::Value::from(value.as_str())))
            .collect();
        let key = format!("{class}:{}", serde_json::Value::Object(object));
        if key.len() > MAX_KEY_LEN {
            let digest = Sha256::digest(key.as_bytes());
            return Self(format!("{class}:sha256:{}", hex::encode(digest)));
        }
        Self(key)
    }

    /// Key for a catalog request.
    pub fn for_request(request: &CatalogRequest) -> Self {
        Self::new(request.class(), &request.identifying_params())
    }

    /// Rebuild a key from its string form (e.g. read back from a backend).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscoverFilters, TimeWindow};

    #[test]
    fn key_is_deterministic() {
        let a = CacheKey::for_request(&CatalogRequest::trending(TimeWindow::Day, 1));
        let b = CacheKey::for_request(&CatalogRequest::trending(TimeWindow::Day, 1));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), r#"trending:{"page":"1","time_window":"day"}"#);
    }

    #[test]
    fn key_differs_on_class() {
        let popular = CacheKey::for_request(&CatalogRequest::popular(1));
        let top_rated = CacheKey::for_request(&CatalogRequest::top_rated(1));
        assert_ne!(popular, top_rated);
    }

    #[test]
    fn key_differs_on_params() {
        let day = CacheKey::for_request(&CatalogRequest::trending(TimeWindow::Day, 1));
        let week = CacheKey::for_request(&CatalogRequest::trending(TimeWindow::Week, 1));
        let page_two = CacheKey::for_request(&CatalogRequest::trending(TimeWindow::Day, 2));
        assert_ne!(day, week);
        assert_ne!(day, page_two);
    }

    #[test]
    fn separators_inside_values_do_not_collide() {
        // "a\",\"page\":\"2" must not be confused with query "a" on page 2.
        let tricky = CacheKey::for_request(&CatalogRequest::search(r#"a","page":"2"#, 1));
        let plain = CacheKey::for_request(&CatalogRequest::search("a", 2));
        assert_ne!(tricky, plain);
    }

    #[test]
    fn absent_filter_differs_from_present_filter() {
        let none = CacheKey::for_request(&CatalogRequest::discover(DiscoverFilters::new(), 1));
        let genre = CacheKey::for_request(&CatalogRequest::discover(
            DiscoverFilters::new().genre(28),
            1,
        ));
        assert_ne!(none, genre);
    }

    #[test]
    fn long_keys_are_digested() {
        let query = "x".repeat(500);
        let key = CacheKey::for_request(&CatalogRequest::search(&query, 1));
        assert!(key.as_str().starts_with("search:sha256:"));
        assert!(key.as_str().len() <= MAX_KEY_LEN);

        let other = CacheKey::for_request(&CatalogRequest::search("y".repeat(500), 1));
        assert_ne!(key, other);
    }
}
