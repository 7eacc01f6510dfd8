//! Metrics declaration and recording helpers.
//!
//! Every helper compiles to an empty inline function when the `metrics`
//! feature is disabled.

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Cache lookup metrics

    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "salesdash_cache_hit_total",
            "Total number of cache hit events."
        );
        "salesdash_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "salesdash_cache_miss_total",
            "Total number of cache miss events."
        );
        "salesdash_cache_miss_total"
    };
    /// Track number of stale cache hits.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "salesdash_cache_stale_total",
            "Total number of cache lookups answered with stale data."
        );
        "salesdash_cache_stale_total"
    };
    /// Track number of capacity evictions.
    pub static ref CACHE_EVICTION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "salesdash_cache_eviction_total",
            "Total number of entries evicted to make room."
        );
        "salesdash_cache_eviction_total"
    };

    // Retry metrics

    /// Track number of operation attempts.
    pub static ref RETRY_ATTEMPT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "salesdash_retry_attempts_total",
            "Total number of attempts made by the retry manager."
        );
        "salesdash_retry_attempts_total"
    };
    /// Track number of operations that gave up.
    pub static ref RETRY_FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "salesdash_retry_failures_total",
            "Total number of operations that failed terminally."
        );
        "salesdash_retry_failures_total"
    };

    // Coordination metrics

    /// Histogram of coordination wall-clock time.
    pub static ref COORDINATION_DURATION: &'static str = {
        metrics::describe_histogram!(
            "salesdash_coordination_duration_seconds",
            metrics::Unit::Seconds,
            "Wall-clock duration of a period coordination pass."
        );
        "salesdash_coordination_duration_seconds"
    };
    /// Track number of upstream calls issued by the coordinator.
    pub static ref COORDINATION_NETWORK_CALLS: &'static str = {
        metrics::describe_counter!(
            "salesdash_coordination_network_calls_total",
            "Total number of upstream calls issued by the coordinator."
        );
        "salesdash_coordination_network_calls_total"
    };
}

/// Record the outcome of a cache lookup.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_lookup(cache: &str, status: salesdash_core::CacheStatus) {
    let counter = match status {
        salesdash_core::CacheStatus::Hit => *CACHE_HIT_COUNTER,
        salesdash_core::CacheStatus::Miss => *CACHE_MISS_COUNTER,
        salesdash_core::CacheStatus::Stale => *CACHE_STALE_COUNTER,
    };
    metrics::counter!(counter, "cache" => cache.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_cache_lookup(_cache: &str, _status: salesdash_core::CacheStatus) {}

/// Record a capacity eviction.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_eviction(cache: &str) {
    metrics::counter!(*CACHE_EVICTION_COUNTER, "cache" => cache.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_eviction(_cache: &str) {}

/// Record one attempt of a retried operation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_attempt(label: &str) {
    metrics::counter!(*RETRY_ATTEMPT_COUNTER, "operation" => label.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_attempt(_label: &str) {}

/// Record a terminal retry failure.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_retry_failure(label: &str, reason: &'static str) {
    metrics::counter!(
        *RETRY_FAILURE_COUNTER,
        "operation" => label.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_retry_failure(_label: &str, _reason: &'static str) {}

/// Record a finished coordination pass.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_coordination(period: &str, duration: Duration, network_calls: usize) {
    metrics::histogram!(*COORDINATION_DURATION, "period" => period.to_string())
        .record(duration.as_secs_f64());
    metrics::counter!(*COORDINATION_NETWORK_CALLS, "period" => period.to_string())
        .increment(network_calls as u64);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_coordination(_period: &str, _duration: Duration, _network_calls: usize) {}
