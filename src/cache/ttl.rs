//! Tiered TTL policy: one expiry duration per resource class.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::types::ResourceClass;
use crate::{CatalogError, Result};

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// Upper bound for any TTL or stale retention window. Longer values are
/// rejected in configuration and clamped in the builder APIs.
pub const MAX_TTL: Duration = Duration::from_secs(365 * DAY);

/// Default TTL for a resource class.
pub fn default_ttl(class: ResourceClass) -> Duration {
    let secs = match class {
        ResourceClass::Trending => 12 * HOUR,
        ResourceClass::Popular => DAY,
        ResourceClass::TopRated => DAY,
        ResourceClass::NowPlaying => 6 * HOUR,
        ResourceClass::Upcoming => 12 * HOUR,
        ResourceClass::Search => HOUR,
        ResourceClass::Discover => 6 * HOUR,
        ResourceClass::Detail => 7 * DAY,
        ResourceClass::Recommendations => 6 * HOUR,
        ResourceClass::Similar => 6 * HOUR,
        ResourceClass::Genres => 30 * DAY,
    };
    Duration::from_secs(secs)
}

/// Maps resource classes to cache lifetimes.
///
/// A class without a TTL fails closed: its responses are never cached and
/// every read goes upstream.
///
/// ```rust
/// # use marquee::cache::TtlPolicy;
/// # use marquee::ResourceClass;
/// # use std::time::Duration;
/// let policy = TtlPolicy::default()
///     .with_ttl(ResourceClass::Search, Duration::from_secs(600))
///     .without(ResourceClass::Discover);
/// assert_eq!(policy.ttl_for(ResourceClass::Search), Some(Duration::from_secs(600)));
/// assert_eq!(policy.ttl_for(ResourceClass::Discover), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    ttls: HashMap<ResourceClass, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ttls: ResourceClass::ALL
                .into_iter()
                .map(|class| (class, default_ttl(class)))
                .collect(),
        }
    }
}

impl TtlPolicy {
    /// A policy that caches nothing.
    pub fn empty() -> Self {
        Self {
            ttls: HashMap::new(),
        }
    }

    /// Apply `name -> seconds` overrides on top of the defaults.
    ///
    /// Unknown class names and TTLs above [`MAX_TTL`] are configuration
    /// errors. Zero disables caching for that class.
    pub fn from_overrides(overrides: &BTreeMap<String, u64>) -> Result<Self> {
        let mut policy = Self::default();
        for (name, secs) in overrides {
            let class = name.parse::<ResourceClass>()?;
            if *secs > MAX_TTL.as_secs() {
                return Err(CatalogError::Configuration(format!(
                    "ttl for '{name}' is {secs}s, the maximum is {}s",
                    MAX_TTL.as_secs()
                )));
            }
            policy = policy.with_ttl(class, Duration::from_secs(*secs));
        }
        Ok(policy)
    }

    /// Set the TTL for a class. A zero TTL removes the class from the policy;
    /// anything above [`MAX_TTL`] is clamped to it.
    pub fn with_ttl(mut self, class: ResourceClass, ttl: Duration) -> Self {
        if ttl.is_zero() {
            self.ttls.remove(&class);
        } else {
            self.ttls.insert(class, ttl.min(MAX_TTL));
        }
        self
    }

    /// Stop caching a class.
    pub fn without(mut self, class: ResourceClass) -> Self {
        self.ttls.remove(&class);
        self
    }

    /// TTL for `class`, or `None` when the class must not be cached.
    pub fn ttl_for(&self, class: ResourceClass) -> Option<Duration> {
        self.ttls.get(&class).copied()
    }

    /// Longest configured TTL.
    pub fn max_ttl(&self) -> Duration {
        self.ttls.values().copied().max().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_class() {
        let policy = TtlPolicy::default();
        for class in ResourceClass::ALL {
            assert!(policy.ttl_for(class).is_some(), "{class} has no ttl");
        }
    }

    #[test]
    fn documented_tiers() {
        let policy = TtlPolicy::default();
        assert_eq!(
            policy.ttl_for(ResourceClass::Trending),
            Some(Duration::from_secs(12 * 3600))
        );
        assert_eq!(
            policy.ttl_for(ResourceClass::Detail),
            Some(Duration::from_secs(7 * 86400))
        );
        assert_eq!(
            policy.ttl_for(ResourceClass::Genres),
            Some(Duration::from_secs(30 * 86400))
        );
        assert_eq!(
            policy.ttl_for(ResourceClass::Search),
            Some(Duration::from_secs(3600))
        );
    }

    #[test]
    fn overrides_apply_and_zero_disables() {
        let mut overrides = BTreeMap::new();
        overrides.insert("trending".to_string(), 60);
        overrides.insert("search".to_string(), 0);
        let policy = TtlPolicy::from_overrides(&overrides).unwrap();
        assert_eq!(
            policy.ttl_for(ResourceClass::Trending),
            Some(Duration::from_secs(60))
        );
        assert_eq!(policy.ttl_for(ResourceClass::Search), None);
        assert_eq!(
            policy.ttl_for(ResourceClass::Popular),
            Some(Duration::from_secs(86400))
        );
    }

    #[test]
    fn unknown_override_is_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("box_office".to_string(), 60);
        assert!(TtlPolicy::from_overrides(&overrides).is_err());
    }

    #[test]
    fn oversized_override_is_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("detail".to_string(), u64::MAX);
        let err = TtlPolicy::from_overrides(&overrides).unwrap_err();
        assert!(matches!(err, CatalogError::Configuration(_)));
        assert!(err.to_string().contains("detail"));
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let policy = TtlPolicy::default().with_ttl(ResourceClass::Detail, Duration::MAX);
        assert_eq!(policy.ttl_for(ResourceClass::Detail), Some(MAX_TTL));
    }

    #[test]
    fn empty_policy_caches_nothing() {
        let policy = TtlPolicy::empty();
        assert_eq!(policy.ttl_for(ResourceClass::Trending), None);
        assert_eq!(policy.max_ttl(), Duration::ZERO);
    }
}
