use serde_json::Value;

use salesdash_core::Granularity;

use super::{CacheManager, CacheOptions};

/// The three cache instances, scoped by data granularity.
///
/// Built explicitly and handed to the coordinator, so every test can own an
/// isolated set.
#[derive(Debug, Clone)]
pub struct CacheSet {
    daily: CacheManager<Value>,
    weekly: CacheManager<Value>,
    monthly: CacheManager<Value>,
}

impl Default for CacheSet {
    fn default() -> Self {
        Self::new(
            CacheOptions::daily(),
            CacheOptions::weekly(),
            CacheOptions::monthly(),
        )
    }
}

impl CacheSet {
    /// Creates the three instances from their options.
    pub fn new(daily: CacheOptions, weekly: CacheOptions, monthly: CacheOptions) -> Self {
        Self {
            daily: CacheManager::new(Granularity::Daily.as_str(), daily),
            weekly: CacheManager::new(Granularity::Weekly.as_str(), weekly),
            monthly: CacheManager::new(Granularity::Monthly.as_str(), monthly),
        }
    }

    /// Creates a set from already built instances.
    pub fn from_parts(
        daily: CacheManager<Value>,
        weekly: CacheManager<Value>,
        monthly: CacheManager<Value>,
    ) -> Self {
        Self {
            daily,
            weekly,
            monthly,
        }
    }

    /// The instance for a granularity.
    pub fn get(&self, granularity: Granularity) -> &CacheManager<Value> {
        match granularity {
            Granularity::Daily => &self.daily,
            Granularity::Weekly => &self.weekly,
            Granularity::Monthly => &self.monthly,
        }
    }

    /// Per-day instance.
    pub fn daily(&self) -> &CacheManager<Value> {
        &self.daily
    }

    /// Per-week instance.
    pub fn weekly(&self) -> &CacheManager<Value> {
        &self.weekly
    }

    /// Per-month instance.
    pub fn monthly(&self) -> &CacheManager<Value> {
        &self.monthly
    }

    /// Applies an invalidation pattern to all three instances.
    pub fn invalidate_all(&self, pattern: &str) -> usize {
        self.iter().map(|cache| cache.invalidate(pattern)).sum()
    }

    /// Empties all three instances.
    pub fn clear(&self) {
        self.iter().for_each(CacheManager::clear);
    }

    fn iter(&self) -> impl Iterator<Item = &CacheManager<Value>> {
        [&self.daily, &self.weekly, &self.monthly].into_iter()
    }
}
