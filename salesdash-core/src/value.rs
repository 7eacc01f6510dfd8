//! Cache lookup results.
//!
//! - [`CacheState`] - Data returned by a cache lookup, tagged fresh or stale
//! - [`CacheStatus`] - How a logical fetch was satisfied (hit, miss, stale)
//!
//! ## Freshness vs Staleness
//!
//! An entry is **fresh** until its expiry instant. Past that instant an entry
//! is either gone (plain TTL caches) or **stale**: still returned, but flagged
//! so the caller can decide to revalidate. This is the stale-while-revalidate
//! pattern: slightly old data is served while a refresh is in flight.

/// Data returned from a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState<T> {
    /// The entry has not reached its expiry instant.
    Actual(T),
    /// The entry is past its expiry instant but was kept for revalidation.
    Stale(T),
}

impl<T> CacheState<T> {
    /// Returns `true` if the data is past its expiry instant.
    #[inline]
    pub fn is_stale(&self) -> bool {
        matches!(self, CacheState::Stale(_))
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        match self {
            CacheState::Actual(data) | CacheState::Stale(data) => data,
        }
    }

    /// Consumes the state and returns the cached data.
    pub fn into_inner(self) -> T {
        match self {
            CacheState::Actual(data) | CacheState::Stale(data) => data,
        }
    }

    /// Maps the cached data while keeping the freshness flag.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CacheState<U> {
        match self {
            CacheState::Actual(data) => CacheState::Actual(f(data)),
            CacheState::Stale(data) => CacheState::Stale(f(data)),
        }
    }

    /// Returns the status this lookup represents.
    pub fn status(&self) -> CacheStatus {
        match self {
            CacheState::Actual(_) => CacheStatus::Hit,
            CacheState::Stale(_) => CacheStatus::Stale,
        }
    }
}

/// Whether a fetch was answered from cache, from stale cache, or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// Fresh cached data was used.
    Hit,
    /// No cached data was found.
    #[default]
    Miss,
    /// Cached data was found past its expiry instant.
    Stale,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Stale => "stale",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_flag() {
        let fresh = CacheState::Actual(1);
        let stale = CacheState::Stale(2);
        assert!(!fresh.is_stale());
        assert!(stale.is_stale());
        assert_eq!(stale.status(), CacheStatus::Stale);
        assert_eq!(fresh.status(), CacheStatus::Hit);
    }

    #[test]
    fn test_map_keeps_flag() {
        let stale = CacheState::Stale(2).map(|v| v * 10);
        assert_eq!(stale, CacheState::Stale(20));
        assert_eq!(stale.into_inner(), 20);
    }
}
