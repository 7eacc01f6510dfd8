use serde::{Deserialize, Serialize};

use salesdash::{CacheOptions, CacheSet};

use crate::error::ConfigError;

/// Settings of the three cache instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachesConfig {
    /// Per-day instance.
    #[serde(default = "CacheOptions::daily")]
    pub daily: CacheOptions,
    /// Per-week instance.
    #[serde(default = "CacheOptions::weekly")]
    pub weekly: CacheOptions,
    /// Per-month instance.
    #[serde(default = "CacheOptions::monthly")]
    pub monthly: CacheOptions,
}

impl Default for CachesConfig {
    fn default() -> Self {
        Self {
            daily: CacheOptions::daily(),
            weekly: CacheOptions::weekly(),
            monthly: CacheOptions::monthly(),
        }
    }
}

impl CachesConfig {
    /// Validates capacities and builds the cache set.
    pub fn into_cache_set(self) -> Result<CacheSet, ConfigError> {
        for (cache, options) in [
            ("daily", &self.daily),
            ("weekly", &self.weekly),
            ("monthly", &self.monthly),
        ] {
            if options.max_entries == 0 {
                return Err(ConfigError::ZeroCapacity { cache });
            }
        }
        Ok(CacheSet::new(self.daily, self.weekly, self.monthly))
    }
}
