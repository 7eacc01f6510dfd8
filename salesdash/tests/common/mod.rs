#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use salesdash::{
    CacheOptions, CacheSet, CoordinatorOptions, RequestCoordinator, RetryPolicy, StalePolicy,
};
use salesdash::retry::MaxAttempts;
use salesdash_core::{BreakdownRequest, DateRange, FetchError, SalesSource};
use serde_json::{Value, json};

/// Scripted upstream keyed by range start date.
#[derive(Debug, Default)]
pub struct MockSource {
    totals: DashMap<String, Result<Value, FetchError>>,
    breakdown: DashMap<String, Result<Value, FetchError>>,
    delays: DashMap<String, Duration>,
    latency: Option<Duration>,
    transient_failures: AtomicUsize,
    down: AtomicBool,
    totals_calls: AtomicUsize,
    breakdown_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Extra latency for calls whose range starts at `start`.
    pub fn delay_for(self, start: &str, delay: Duration) -> Self {
        self.delays.insert(start.to_owned(), delay);
        self
    }

    pub fn totals(self, start: &str, total: f64) -> Self {
        self.totals.insert(start.to_owned(), Ok(summary(total)));
        self
    }

    pub fn totals_error(self, start: &str, error: FetchError) -> Self {
        self.totals.insert(start.to_owned(), Err(error));
        self
    }

    pub fn breakdown(self, start: &str, value: Value) -> Self {
        self.breakdown.insert(start.to_owned(), Ok(value));
        self
    }

    pub fn breakdown_error(self, start: &str, error: FetchError) -> Self {
        self.breakdown.insert(start.to_owned(), Err(error));
        self
    }

    /// The next `n` totals calls answer 503.
    pub fn transient_failures(self, n: usize) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Every call fails with 401 while down.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn totals_calls(&self) -> usize {
        self.totals_calls.load(Ordering::SeqCst)
    }

    pub fn breakdown_calls(&self) -> usize {
        self.breakdown_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.totals_calls() + self.breakdown_calls()
    }

    async fn wait(&self, start: &str) {
        let delay = self.delays.get(start).map(|d| *d).or(self.latency);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SalesSource for MockSource {
    async fn fetch_totals(&self, range: &DateRange) -> Result<Value, FetchError> {
        self.totals_calls.fetch_add(1, Ordering::SeqCst);
        let start = range.start_iso();
        self.wait(&start).await;
        if self.down.load(Ordering::SeqCst) {
            return Err(FetchError::Http { status: 401 });
        }
        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(FetchError::Http { status: 503 });
        }
        match self.totals.get(&start) {
            Some(result) => result.clone(),
            None => Ok(summary(0.0)),
        }
    }

    async fn fetch_breakdown(&self, request: &BreakdownRequest) -> Result<Value, FetchError> {
        self.breakdown_calls.fetch_add(1, Ordering::SeqCst);
        let start = request.bucket_keys().first().cloned().unwrap_or_default();
        self.wait(&start).await;
        if self.down.load(Ordering::SeqCst) {
            return Err(FetchError::Http { status: 401 });
        }
        match self.breakdown.get(&start) {
            Some(result) => result.clone(),
            None => Ok(json!({})),
        }
    }
}

pub fn summary(total: f64) -> Value {
    json!({
        "sales": {"total": total, "subtotal": total * 0.84},
        "cards": {
            "Centro": {
                "open_accounts": {"total": 3, "money": "1,250.50"},
                "closed_ticket": {"total": 40, "money": total},
                "average_ticket": 1500,
                "percentage": {"icon": "up", "qty": 4.5},
                "date": "2025-09-08",
                "store_id": 7
            }
        }
    })
}

pub fn week_breakdown() -> Value {
    json!({
        "2025-09-02": {"total": 20000, "details": {}},
        "2025-09-03": {"total": 25000, "details": {}},
        "2025-09-04": {"total": 30000, "details": {}},
        "2025-09-05": {"total": 35000, "details": {}},
        "2025-09-06": {"total": 40000, "details": {}},
        "2025-09-07": {"total": 15000, "details": {}},
        "2025-09-08": {"total": 15000, "details": {}},
    })
}

/// Fast deterministic retry policy for tests.
pub fn quick_retry(attempts: u8) -> RetryPolicy {
    RetryPolicy::new(
        MaxAttempts::new(attempts).unwrap(),
        Duration::from_millis(100),
        Duration::from_millis(400),
    )
}

pub fn options(stale_policy: StalePolicy) -> CoordinatorOptions {
    CoordinatorOptions {
        stale_policy,
        totals_retry: quick_retry(3),
        breakdown_retry: quick_retry(3),
        ..CoordinatorOptions::default()
    }
}

/// Caches whose entries expire after one second.
pub fn short_lived_caches() -> CacheSet {
    let options = CacheOptions::default().default_ttl(Duration::from_secs(1));
    CacheSet::new(options.clone(), options.clone(), options)
}

pub fn coordinator(source: Arc<MockSource>) -> RequestCoordinator<Arc<MockSource>> {
    RequestCoordinator::new(source, CacheSet::default(), options(StalePolicy::default()))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
