//! # salesdash
//!
//! Data-fetch layer of the salesdash sales-analytics dashboard. A weekly view
//! needs current totals, comparison totals and a per-day breakdown; rendered
//! naively every widget asks the upstream on its own. This crate turns that
//! into at most three concurrent, cached and retried calls per period.
//!
//! ```text
//! PeriodQuery ──> RequestCoordinator ──> CacheSet (daily/weekly/monthly)
//!      │                  │
//!      │                  └──> RetryManager ──> SalesSource (upstream)
//!      └──> LoadingCoordinator
//! ```
//!
//! The upstream itself is the [`SalesSource`] trait; `salesdash-reqwest`
//! provides the HTTP implementation.
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Cache Manager.
///
/// [`CacheManager`](cache::CacheManager) is a keyed TTL store with
/// stale-while-revalidate, glob invalidation and oldest-first eviction;
/// [`CacheSet`](cache::CacheSet) bundles the daily, weekly and monthly
/// instances handed to the coordinator.
pub mod cache;

/// Request Coordinator.
///
/// Plans the three logical fetches of a period, answers them from cache
/// where possible, issues the rest concurrently and folds the settled
/// results into a [`UnifiedPeriodResult`](coordinator::UnifiedPeriodResult).
pub mod coordinator;

/// Loading State Coordinator.
pub mod loading;

/// Metrics collection.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Cache hits, misses, stale lookups and evictions
/// - Retry attempts and terminal failures
/// - Coordination duration and network calls
pub mod metrics;

/// Background revalidation for the `OffloadRevalidate` stale policy.
pub mod offload;

/// Stale entry handling.
pub mod policy;

/// The consumer-facing period query.
pub mod query;

/// Retry Manager.
///
/// Exponential backoff with optional jitter around any fallible async
/// operation, with failures classified as transient or permanent.
pub mod retry;

pub use cache::{CacheManager, CacheOptions, CacheSet};
pub use coordinator::{
    Coordination, CoordinatorError, CoordinatorOptions, PerformanceMetrics, RequestCoordinator,
    UnifiedPeriodResult,
};
pub use loading::{LoadingCoordinator, LoadingOptions, LoadingSnapshot};
pub use policy::StalePolicy;
pub use query::{PeriodQuery, PeriodState};
pub use retry::{RetryError, RetryManager, RetryPolicy, RetryPreset};

pub use salesdash_core::{
    CacheKey, CacheState, CacheStatus, DateRange, FetchError, PeriodType, SalesSource,
};
