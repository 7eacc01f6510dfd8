//! In-memory TTL cache with stale-while-revalidate and oldest-first eviction.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use salesdash_core::{CacheState, CacheStatus, CacheTag};

use super::options::CacheOptions;
use crate::metrics;

/// A stored value with its freshness window.
///
/// Entries are never mutated: a second `set` for the same key replaces the
/// entry wholesale. `expiry_time` is always `timestamp + ttl`.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    data: T,
    timestamp: Instant,
    expiry_time: Instant,
    tag: CacheTag,
    sequence: u64,
}

impl<T> CacheEntry<T> {
    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// When the entry was stored.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// When the entry stops being fresh.
    #[inline]
    pub fn expiry_time(&self) -> Instant {
        self.expiry_time
    }

    /// Provenance marker supplied on `set`.
    #[inline]
    pub fn tag(&self) -> &CacheTag {
        &self.tag
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expiry_time <= now
    }

    /// Eviction order: oldest timestamp first, insertion order breaks ties.
    fn age_rank(&self) -> (Instant, u64) {
        (self.timestamp, self.sequence)
    }
}

/// Counters describing cache activity since creation or the last `clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered with fresh data.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Lookups answered with stale data.
    pub stale_hits: u64,
    /// Entries removed to make room for new ones.
    pub evictions: u64,
    /// Entries removed by `invalidate`.
    pub invalidations: u64,
    /// Entries dropped because they expired.
    pub expirations: u64,
    /// Entries currently stored.
    pub size: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.stale_hits,
            &self.evictions,
            &self.invalidations,
            &self.expirations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug)]
struct CacheInner<T> {
    label: CacheTag,
    options: CacheOptions,
    entries: DashMap<String, CacheEntry<T>>,
    sequence: AtomicU64,
    counters: Counters,
}

/// A keyed TTL store for upstream results.
///
/// Cloning is cheap and clones share the same store, so one instance can be
/// handed to the coordinator and to background revalidation tasks.
///
/// # Expiry
///
/// - Before `expiry_time` a lookup returns [`CacheState::Actual`].
/// - After it, with `stale_while_revalidate` enabled, the entry is kept and
///   returned as [`CacheState::Stale`]; the caller decides whether to refetch.
/// - After it, without `stale_while_revalidate`, the entry is deleted and the
///   lookup misses.
///
/// # Capacity
///
/// Inserting a new key into a full store first evicts the single entry with
/// the oldest `timestamp`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use salesdash::cache::{CacheManager, CacheOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = CacheManager::new("weekly", CacheOptions::default().max_entries(10));
/// cache.set("sales:week=1", serde_json::json!({"total": 10}), "upstream", None);
/// let state = cache.get("sales:week=1").unwrap();
/// assert!(!state.is_stale());
/// assert_eq!(cache.invalidate("sales:*"), 1);
/// # }
/// ```
#[derive(Debug)]
pub struct CacheManager<T = Value> {
    inner: Arc<CacheInner<T>>,
}

impl<T> Clone for CacheManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> CacheManager<T>
where
    T: Clone,
{
    /// Creates an empty cache instance.
    pub fn new(label: impl Into<CacheTag>, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                label: label.into(),
                options,
                entries: DashMap::new(),
                sequence: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    /// The instance label used in logs and metrics.
    pub fn label(&self) -> &CacheTag {
        &self.inner.label
    }

    /// The options this instance was built with.
    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// Stores `data` under `key` for `ttl`, or the default TTL when `None`.
    ///
    /// When the store is full and `key` is new, the oldest entry is evicted
    /// first, which may drop an unrelated key.
    pub fn set(&self, key: &str, data: T, tag: impl Into<CacheTag>, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.inner.options.default_ttl);
        let now = Instant::now();
        let entry = CacheEntry {
            data,
            timestamp: now,
            expiry_time: now + ttl,
            tag: tag.into(),
            sequence: self.inner.sequence.fetch_add(1, Ordering::Relaxed),
        };

        if !self.inner.entries.contains_key(key) {
            while self.inner.entries.len() >= self.inner.options.max_entries.max(1) {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        trace!(cache = %self.inner.label, key, ttl_ms = ttl.as_millis() as u64, "cache set");
        self.inner.entries.insert(key.to_owned(), entry);
    }

    /// Looks up `key`.
    ///
    /// Returns `None` on a miss. Expired entries are returned as
    /// [`CacheState::Stale`] when stale-while-revalidate is enabled and are
    /// deleted otherwise.
    pub fn get(&self, key: &str) -> Option<CacheState<T>> {
        let now = Instant::now();
        // Copy out and release the shard guard before any removal.
        let found = self
            .inner
            .entries
            .get(key)
            .map(|entry| (entry.is_expired(now), entry.data.clone()));
        let state = match found {
            None => None,
            Some((false, data)) => Some(CacheState::Actual(data)),
            Some((true, data)) if self.inner.options.stale_while_revalidate => {
                Some(CacheState::Stale(data))
            }
            Some((true, _)) => {
                self.expire(key);
                None
            }
        };
        self.record_lookup(key, state.as_ref().map_or(CacheStatus::Miss, CacheState::status));
        state
    }

    /// Returns whether `key` is present, applying the same expiry rules as
    /// [`get`](Self::get), including deletion of expired entries.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let expired = match self.inner.entries.get(key) {
            None => return false,
            Some(entry) => entry.is_expired(now),
        };
        if expired && !self.inner.options.stale_while_revalidate {
            self.expire(key);
            return false;
        }
        true
    }

    /// Remaining freshness of `key`, `None` when missing or already expired.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.inner
            .entries
            .get(key)
            .and_then(|entry| entry.expiry_time.checked_duration_since(now))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Returns a copy of the raw entry for `key` without applying expiry.
    pub fn entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.inner.entries.get(key).map(|entry| entry.clone())
    }

    /// Deletes `key`, counted as an invalidation. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.inner.entries.remove(key).is_some();
        if removed {
            self.inner.counters.invalidations.fetch_add(1, Ordering::Relaxed);
            debug!(cache = %self.inner.label, key, "cache entry removed");
        }
        removed
    }

    /// Deletes every key matching `pattern`, where `*` matches anything.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let matcher = match glob_to_regex(pattern) {
            Ok(matcher) => matcher,
            Err(err) => {
                warn!(cache = %self.inner.label, pattern, error = %err, "invalid invalidation pattern");
                return 0;
            }
        };
        let before = self.inner.entries.len();
        self.inner.entries.retain(|key, _| !matcher.is_match(key));
        let removed = before.saturating_sub(self.inner.entries.len());
        self.inner
            .counters
            .invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        debug!(cache = %self.inner.label, pattern, removed, "cache invalidated");
        removed
    }

    /// Removes every expired entry, stale-while-revalidate or not.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.inner.entries.len());
        self.inner
            .counters
            .expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Empties the store and resets its counters.
    pub fn clear(&self) {
        self.inner.entries.clear();
        self.inner.counters.reset();
        debug!(cache = %self.inner.label, "cache cleared");
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            stale_hits: counters.stale_hits.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            invalidations: counters.invalidations.load(Ordering::Relaxed),
            expirations: counters.expirations.load(Ordering::Relaxed),
            size: self.inner.entries.len(),
        }
    }

    fn expire(&self, key: &str) {
        if self.inner.entries.remove(key).is_some() {
            self.inner.counters.expirations.fetch_add(1, Ordering::Relaxed);
            trace!(cache = %self.inner.label, key, "expired entry removed");
        }
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .inner
            .entries
            .iter()
            .min_by_key(|entry| entry.value().age_rank())
            .map(|entry| entry.key().clone());
        let Some(key) = oldest else {
            return false;
        };
        let evicted = self.inner.entries.remove(&key).is_some();
        if evicted {
            self.inner.counters.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::record_eviction(self.inner.label.as_str());
            debug!(cache = %self.inner.label, key, "evicted oldest entry");
        }
        evicted
    }

    fn record_lookup(&self, key: &str, status: CacheStatus) {
        let counter = match status {
            CacheStatus::Hit => &self.inner.counters.hits,
            CacheStatus::Miss => &self.inner.counters.misses,
            CacheStatus::Stale => &self.inner.counters.stale_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(self.inner.label.as_str(), status);
        trace!(cache = %self.inner.label, key, status = status.as_str(), "cache lookup");
    }
}

/// Compiles a `*` glob into an anchored regex; every other character is literal.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}
