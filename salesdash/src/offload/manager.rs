//! Registry of background revalidation tasks.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, warn};

use salesdash_core::CacheKey;

use super::policy::{OffloadConfig, TimeoutPolicy};

/// Upper bound between registry checks in [`OffloadManager::wait_all`].
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct Revalidation {
    id: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct Registry {
    config: OffloadConfig,
    running: DashMap<CacheKey, Revalidation>,
    next_id: AtomicU64,
    finished: Notify,
}

/// Runs cache revalidations in background tasks.
///
/// With deduplication on, a burst of stale reads of one entry triggers a
/// single refresh. Clones share the registry.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    registry: Arc<Registry>,
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::new(OffloadConfig::default())
    }
}

impl OffloadManager {
    /// Create a manager with the given configuration.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            registry: Arc::new(Registry {
                config,
                running: DashMap::new(),
                next_id: AtomicU64::new(0),
                finished: Notify::new(),
            }),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &OffloadConfig {
        &self.registry.config
    }

    /// Refresh `key` in the background.
    ///
    /// Returns `false` when deduplication is on and a refresh of the same
    /// key is still running; `task` is dropped unpolled in that case.
    pub fn spawn<F>(&self, key: CacheKey, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.registry.running.entry(key) {
            Entry::Occupied(slot)
                if self.registry.config.deduplicate && !slot.get().handle.is_finished() =>
            {
                debug!(key = %slot.key(), "revalidation already in flight");
                false
            }
            entry => {
                let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
                let handle = self.run(entry.key().clone(), id, task);
                entry.insert(Revalidation { id, handle });
                true
            }
        }
    }

    /// Number of revalidations still running.
    pub fn active_count(&self) -> usize {
        self.registry
            .running
            .iter()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    /// Whether a refresh of `key` is running.
    pub fn in_flight(&self, key: &CacheKey) -> bool {
        self.registry
            .running
            .get(key)
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Abort every running revalidation.
    pub fn cancel_all(&self) {
        self.registry.running.retain(|key, task| {
            debug!(%key, "revalidation aborted");
            task.handle.abort();
            false
        });
        self.registry.finished.notify_waiters();
    }

    /// Wait until no revalidation is running.
    pub async fn wait_all(&self) {
        loop {
            let finished = self.registry.finished.notified();
            self.registry
                .running
                .retain(|_, task| !task.handle.is_finished());
            if self.registry.running.is_empty() {
                return;
            }
            // Aborted tasks never notify.
            let _ = tokio::time::timeout(WAIT_POLL_INTERVAL, finished).await;
        }
    }

    /// Like [`wait_all`](Self::wait_all), giving up after `timeout`.
    ///
    /// Returns `true` if everything finished in time.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn run<F>(&self, key: CacheKey, id: u64, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let timeout_policy = registry.config.timeout_policy;
        let span = info_span!("revalidate", key = %key);

        tokio::spawn(
            async move {
                let started = Instant::now();
                match timeout_policy {
                    TimeoutPolicy::None => task.await,
                    TimeoutPolicy::Cancel(limit) => {
                        if tokio::time::timeout(limit, task).await.is_err() {
                            warn!(limit_ms = limit.as_millis() as u64, "revalidation timed out");
                        }
                    }
                    TimeoutPolicy::Warn(limit) => {
                        task.await;
                        let elapsed = started.elapsed();
                        if elapsed > limit {
                            warn!(
                                elapsed_ms = elapsed.as_millis() as u64,
                                limit_ms = limit.as_millis() as u64,
                                "slow revalidation"
                            );
                        }
                    }
                }
                registry.running.remove_if(&key, |_, task| task.id == id);
                registry.finished.notify_waiters();
            }
            .instrument(span),
        )
    }
}
