//! Request Coordinator: one period, at most three concurrent upstream calls.
//!
//! A pass plans the current totals, comparison totals and breakdown fetches
//! ([`PeriodRequestPlan`]), answers each from its cache instance where
//! possible, issues the remaining calls concurrently through the retry
//! manager and folds whatever settled into a [`UnifiedPeriodResult`].
//!
//! ```text
//! Idle -> Planning -> FetchingConcurrent -> Reducing -> Settled | AllFailed
//! ```
//!
//! A failed piece degrades the result instead of failing the pass; only a
//! pass where every fetch failed returns [`CoordinatorError::AllCallsFailed`].

mod error;
mod plan;
mod result;

use std::sync::Arc;

use futures::future::join3;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, warn};

use salesdash_core::{
    Breakdown, CacheState, CacheStatus, CacheTag, DateRange, FetchError, PeriodType, SalesSource,
    SalesSummary,
};

pub use error::{CoordinatorError, FetchFailure};
pub use plan::{
    BREAKDOWN_PREFIX, FetchCall, FetchKind, PeriodRequestPlan, PlannedFetch, TOTALS_PREFIX,
    breakdown_key, totals_key,
};
pub use result::{
    ChartPoint, ChartSeries, Coordination, FetchProvenance, PerformanceMetrics,
    UnifiedPeriodResult, percentage_change,
};

use crate::cache::CacheSet;
use crate::metrics;
use crate::offload::OffloadManager;
use crate::policy::StalePolicy;
use crate::retry::{RetryError, RetryManager, RetryPolicy};

/// Tag suffix of entries refreshed by background revalidation.
const REVALIDATED: CacheTag = CacheTag::new_static("revalidated");

/// Default cap on the number of weeks in a monthly breakdown.
pub const DEFAULT_MAX_WEEKS: usize = 10;

/// Coordinator behavior settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorOptions {
    /// What to do with stale cache entries.
    pub stale_policy: StalePolicy,
    /// Cap on the number of weeks in a monthly breakdown.
    pub max_weeks: usize,
    /// Retry policy for both totals fetches.
    pub totals_retry: RetryPolicy,
    /// Retry policy for the breakdown fetch.
    pub breakdown_retry: RetryPolicy,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            stale_policy: StalePolicy::default(),
            max_weeks: DEFAULT_MAX_WEEKS,
            totals_retry: RetryPolicy::realtime(),
            breakdown_retry: RetryPolicy::background(),
        }
    }
}

struct CoordinatorInner<S> {
    source: S,
    caches: CacheSet,
    totals_retry: RetryManager,
    breakdown_retry: RetryManager,
    stale_policy: StalePolicy,
    max_weeks: usize,
    offload: OffloadManager,
}

/// Settled outcome of one logical fetch.
struct Resolved {
    value: Result<Value, RetryError<FetchError>>,
    provenance: FetchProvenance,
}

impl Resolved {
    fn cached(status: CacheStatus, value: Value) -> Self {
        Self {
            value: Ok(value),
            provenance: FetchProvenance {
                status,
                network_call: false,
                succeeded: true,
            },
        }
    }

    fn fetched(status: CacheStatus, value: Result<Value, RetryError<FetchError>>) -> Self {
        let succeeded = value.is_ok();
        Self {
            value,
            provenance: FetchProvenance {
                status,
                network_call: true,
                succeeded,
            },
        }
    }
}

/// Turns a period into one [`UnifiedPeriodResult`].
///
/// Cheap to clone; clones share the source, the caches and the background
/// revalidation registry.
///
/// # Examples
///
/// ```rust,ignore
/// let coordinator = RequestCoordinator::new(source, CacheSet::default(), CoordinatorOptions::default());
/// match coordinator.coordinate("2025-09-02", "2025-09-08", PeriodType::Weekly).await? {
///     Coordination::Settled(result) => println!("{}%", result.percentage_change),
///     Coordination::Idle { reason } => println!("nothing to show: {reason}"),
/// }
/// ```
pub struct RequestCoordinator<S> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S> Clone for RequestCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for RequestCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("caches", &self.inner.caches)
            .field("stale_policy", &self.inner.stale_policy)
            .field("max_weeks", &self.inner.max_weeks)
            .finish_non_exhaustive()
    }
}

impl<S> RequestCoordinator<S>
where
    S: SalesSource + 'static,
{
    /// Creates a coordinator with its own background revalidation registry.
    pub fn new(source: S, caches: CacheSet, options: CoordinatorOptions) -> Self {
        Self::with_offload(source, caches, options, OffloadManager::default())
    }

    /// Creates a coordinator sharing an existing revalidation registry.
    pub fn with_offload(
        source: S,
        caches: CacheSet,
        options: CoordinatorOptions,
        offload: OffloadManager,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                source,
                caches,
                totals_retry: RetryManager::new(options.totals_retry),
                breakdown_retry: RetryManager::new(options.breakdown_retry),
                stale_policy: options.stale_policy,
                max_weeks: options.max_weeks,
                offload,
            }),
        }
    }

    /// The cache instances in use.
    pub fn caches(&self) -> &CacheSet {
        &self.inner.caches
    }

    /// The background revalidation registry.
    pub fn offload(&self) -> &OffloadManager {
        &self.inner.offload
    }

    /// Coordinates a period given as ISO `yyyy-MM-dd` strings.
    ///
    /// Empty, malformed or inverted dates yield [`Coordination::Idle`]
    /// without any upstream call.
    pub async fn coordinate(
        &self,
        start: &str,
        end: &str,
        period: PeriodType,
    ) -> Result<Coordination, CoordinatorError> {
        match DateRange::parse(start, end) {
            Ok(range) => self.coordinate_range(range, period).await,
            Err(reason) => {
                debug!(start, end, %reason, "coordination skipped");
                Ok(Coordination::Idle { reason })
            }
        }
    }

    /// Coordinates an already validated range.
    pub async fn coordinate_range(
        &self,
        range: DateRange,
        period: PeriodType,
    ) -> Result<Coordination, CoordinatorError> {
        let plan = match PeriodRequestPlan::new(range, period, self.inner.max_weeks) {
            Ok(plan) => plan,
            Err(reason) => {
                debug!(%range, %reason, "coordination skipped");
                return Ok(Coordination::Idle { reason });
            }
        };

        let span = info_span!("coordinate", period = %period, range = %range);
        self.run(plan).instrument(span).await
    }

    async fn run(&self, plan: PeriodRequestPlan) -> Result<Coordination, CoordinatorError> {
        let started = Instant::now();
        debug!(
            comparison = %plan.comparison(),
            breakdown = plan.breakdown().is_some(),
            "period planned"
        );

        // Every branch is polled from the first poll on; none waits for another.
        let (current, comparison, breakdown) = join3(
            self.resolve(plan.current_fetch()),
            self.resolve(plan.comparison_fetch()),
            async {
                match plan.breakdown() {
                    Some(fetch) => Some(self.resolve(fetch).await),
                    None => None,
                }
            },
        )
        .await;
        let concurrent_phase = started.elapsed();

        let mut failures = Vec::new();
        let mut provenance = [current.provenance, comparison.provenance];

        let current_data = settle(
            FetchKind::CurrentTotals,
            current.value,
            decode_summary,
            &mut provenance[0],
            &mut failures,
        );
        let comparison_data = settle(
            FetchKind::ComparisonTotals,
            comparison.value,
            decode_summary,
            &mut provenance[1],
            &mut failures,
        );

        let (chart_data, breakdown_provenance) = match (breakdown, plan.breakdown()) {
            (Some(resolved), Some(fetch)) => {
                let mut provenance = resolved.provenance;
                let chart = settle(
                    FetchKind::Breakdown,
                    resolved.value,
                    Breakdown::from_value,
                    &mut provenance,
                    &mut failures,
                )
                .and_then(|breakdown| match &fetch.call {
                    FetchCall::Breakdown(request) => Some(ChartSeries::from_breakdown(
                        fetch.granularity,
                        request,
                        &breakdown,
                    )),
                    FetchCall::Totals(_) => None,
                });
                (chart, Some(provenance))
            }
            _ => (None, None),
        };

        let attempted = 2 + usize::from(breakdown_provenance.is_some());
        if failures.len() == attempted {
            warn!(failures = failures.len(), "every upstream fetch failed");
            return Err(CoordinatorError::AllCallsFailed {
                range: plan.current(),
                failures,
            });
        }

        let previous_amount = comparison_data.as_ref().map_or(0.0, SalesSummary::total);
        let change = match (&current_data, &comparison_data) {
            (Some(current), Some(previous)) => percentage_change(current.total(), previous.total()),
            _ => 0.0,
        };

        let all = provenance.iter().chain(breakdown_provenance.iter());
        let network_calls = all.clone().filter(|p| p.network_call).count();
        let cache_hits = all.filter(|p| p.served_from_cache()).count();
        let total = started.elapsed();

        metrics::record_coordination(plan.period().as_str(), total, network_calls);
        debug!(
            network_calls,
            cache_hits,
            degraded = !failures.is_empty(),
            elapsed_ms = total.as_millis() as u64,
            "coordination settled"
        );

        Ok(Coordination::Settled(Box::new(UnifiedPeriodResult {
            period: plan.period(),
            current_range: plan.current(),
            comparison_range: plan.comparison(),
            current_data,
            comparison_data,
            chart_data,
            percentage_change: change,
            previous_amount,
            performance_metrics: PerformanceMetrics {
                total,
                concurrent_phase,
                estimated_sequential: concurrent_phase * attempted as u32,
                network_calls,
                cache_hits,
                current: provenance[0],
                comparison: provenance[1],
                breakdown: breakdown_provenance,
            },
        })))
    }

    async fn resolve(&self, fetch: &PlannedFetch) -> Resolved {
        let cache = self.inner.caches.get(fetch.granularity);
        let kind = fetch.kind.as_str();

        // An entry that no longer decodes counts as a miss.
        let cached = cache.get(fetch.key.as_str()).filter(|state| {
            match validate(&fetch.call, state.data()) {
                Ok(()) => true,
                Err(error) => {
                    warn!(fetch = kind, cache = %cache.label(), %error, "dropping undecodable cache entry");
                    cache.remove(fetch.key.as_str());
                    false
                }
            }
        });

        match cached {
            Some(CacheState::Actual(value)) => {
                debug!(fetch = kind, cache = %cache.label(), "cache hit");
                Resolved::cached(CacheStatus::Hit, value)
            }
            Some(CacheState::Stale(value)) => match self.inner.stale_policy {
                StalePolicy::Return => {
                    debug!(fetch = kind, cache = %cache.label(), "serving stale entry");
                    Resolved::cached(CacheStatus::Stale, value)
                }
                StalePolicy::OffloadRevalidate => {
                    self.revalidate_in_background(fetch);
                    Resolved::cached(CacheStatus::Stale, value)
                }
                StalePolicy::Revalidate => {
                    match self.inner.fetch_and_store(fetch, fetch.kind.tag()).await {
                        Ok(fresh) => Resolved::fetched(CacheStatus::Stale, Ok(fresh)),
                        Err(error) => {
                            warn!(fetch = kind, %error, "revalidation failed, serving stale entry");
                            Resolved::fetched(CacheStatus::Stale, Ok(value))
                        }
                    }
                }
            },
            None => {
                debug!(fetch = kind, cache = %cache.label(), "cache miss");
                let fetched = self.inner.fetch_and_store(fetch, fetch.kind.tag()).await;
                Resolved::fetched(CacheStatus::Miss, fetched)
            }
        }
    }

    fn revalidate_in_background(&self, fetch: &PlannedFetch) {
        let inner = Arc::clone(&self.inner);
        let task_fetch = fetch.clone();
        let tag = fetch.kind.tag().compose(&REVALIDATED);
        let scheduled = self.inner.offload.spawn(fetch.key.clone(), async move {
            if let Err(error) = inner.fetch_and_store(&task_fetch, tag).await {
                warn!(fetch = task_fetch.kind.as_str(), %error, "background revalidation failed");
            }
        });
        if scheduled {
            debug!(fetch = fetch.kind.as_str(), "serving stale entry, revalidation scheduled");
        } else {
            debug!(fetch = fetch.kind.as_str(), "serving stale entry, revalidation in flight");
        }
    }
}

impl<S> CoordinatorInner<S>
where
    S: SalesSource,
{
    /// Fetches through the retry manager and caches the raw payload under `tag`.
    async fn fetch_and_store(
        &self,
        fetch: &PlannedFetch,
        tag: CacheTag,
    ) -> Result<Value, RetryError<FetchError>> {
        let retry = match fetch.kind {
            FetchKind::Breakdown => &self.breakdown_retry,
            FetchKind::CurrentTotals | FetchKind::ComparisonTotals => &self.totals_retry,
        };
        let value = retry
            .execute_with_retry(fetch.kind.as_str(), || self.call(&fetch.call))
            .await?;
        self.caches.get(fetch.granularity).set(
            fetch.key.as_str(),
            value.clone(),
            tag,
            None,
        );
        Ok(value)
    }

    /// One upstream call; payloads that do not decode are rejected before
    /// they can be cached.
    async fn call(&self, call: &FetchCall) -> Result<Value, FetchError> {
        let value = match call {
            FetchCall::Totals(range) => self.source.fetch_totals(range).await?,
            FetchCall::Breakdown(request) => self.source.fetch_breakdown(request).await?,
        };
        validate(call, &value)?;
        Ok(value)
    }
}

/// Checks that a raw payload decodes into the shape `call` expects.
fn validate(call: &FetchCall, value: &Value) -> Result<(), FetchError> {
    match call {
        FetchCall::Totals(_) => SalesSummary::deserialize(value).map(drop)?,
        FetchCall::Breakdown(_) => Breakdown::from_value(value.clone()).map(drop)?,
    }
    Ok(())
}

fn decode_summary(value: Value) -> Result<SalesSummary, FetchError> {
    SalesSummary::from_value(value)
}

/// Decodes a settled fetch, recording a failure when it produced nothing.
fn settle<T>(
    kind: FetchKind,
    value: Result<Value, RetryError<FetchError>>,
    decode: impl FnOnce(Value) -> Result<T, FetchError>,
    provenance: &mut FetchProvenance,
    failures: &mut Vec<FetchFailure>,
) -> Option<T> {
    let outcome = value.and_then(|value| {
        decode(value).map_err(|source| {
            // Payloads are validated before they get here.
            RetryError::NonRetryable {
                label: kind.as_str().into(),
                attempt: 0,
                source,
            }
        })
    });
    match outcome {
        Ok(data) => Some(data),
        Err(error) => {
            warn!(fetch = kind.as_str(), %error, "fetch failed");
            provenance.succeeded = false;
            failures.push(FetchFailure { kind, error });
            None
        }
    }
}
