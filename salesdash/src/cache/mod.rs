//! Cache Manager: keyed TTL stores for upstream results.
//!
//! - [`CacheManager`] - one store with TTL, stale-while-revalidate, glob
//!   invalidation and oldest-first eviction
//! - [`CacheSet`] - the daily, weekly and monthly instances
//! - [`CacheOptions`] - per-instance TTL, capacity and staleness settings

mod manager;
mod options;
mod set;

pub use manager::{CacheEntry, CacheManager, CacheStats};
pub use options::CacheOptions;
pub use set::CacheSet;
pub use salesdash_core::{CacheKey, CacheState, CacheStatus, CacheTag, generate_key};
