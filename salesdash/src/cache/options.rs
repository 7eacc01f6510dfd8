//! Cache instance configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one [`CacheManager`](super::CacheManager) instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL applied when `set` is called without one.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
    /// Maximum number of entries before oldest-first eviction.
    pub max_entries: usize,
    /// Keep expired entries and return them flagged stale.
    #[serde(default)]
    pub stale_while_revalidate: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            max_entries: 50,
            stale_while_revalidate: true,
        }
    }
}

impl CacheOptions {
    /// Defaults for the per-day instance: short-lived, many entries.
    pub fn daily() -> Self {
        Self {
            default_ttl: Duration::from_secs(2 * 60),
            max_entries: 100,
            stale_while_revalidate: true,
        }
    }

    /// Defaults for the per-week instance.
    pub fn weekly() -> Self {
        Self::default()
    }

    /// Defaults for the per-month instance: monthly aggregates change slowly.
    pub fn monthly() -> Self {
        Self {
            default_ttl: Duration::from_secs(15 * 60),
            max_entries: 24,
            stale_while_revalidate: true,
        }
    }

    /// Set the default TTL.
    pub fn default_ttl(self, ttl: Duration) -> Self {
        Self {
            default_ttl: ttl,
            ..self
        }
    }

    /// Set the capacity.
    pub fn max_entries(self, max_entries: usize) -> Self {
        Self {
            max_entries,
            ..self
        }
    }

    /// Enable or disable stale-while-revalidate.
    pub fn stale_while_revalidate(self, enabled: bool) -> Self {
        Self {
            stale_while_revalidate: enabled,
            ..self
        }
    }
}
