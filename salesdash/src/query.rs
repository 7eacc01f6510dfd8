//! Consumer-facing period query with refetch and request fencing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use tokio::sync::watch;
use tracing::debug;

use salesdash_core::{DateRange, PeriodType, SalesSource, SalesSummary};

use crate::coordinator::{
    ChartSeries, Coordination, CoordinatorError, PerformanceMetrics, RequestCoordinator,
};
use crate::loading::{LoadingCoordinator, LoadingOptions, LoadingSnapshot};

const PERIOD_FLAG: &str = "period";

/// Counts a run as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Arguments of the last requested period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRequest {
    /// Start date, ISO `yyyy-MM-dd`.
    pub start: String,
    /// End date, ISO `yyyy-MM-dd`.
    pub end: String,
    /// Period type.
    pub period: PeriodType,
}

/// What a dashboard view renders for its period.
#[derive(Debug, Clone, Default)]
pub struct PeriodState {
    /// The request this state belongs to.
    pub request: Option<PeriodRequest>,
    /// Totals and branch cards for the requested range.
    pub current_data: Option<SalesSummary>,
    /// Totals and branch cards for the comparison range.
    pub comparison_data: Option<SalesSummary>,
    /// Breakdown chart.
    pub chart_data: Option<ChartSeries>,
    /// Change against the comparison total, in percent with one decimal.
    pub percentage_change: f64,
    /// Comparison total.
    pub previous_amount: f64,
    /// A coordination pass is running.
    pub is_loading: bool,
    /// Set when every fetch of the last pass failed.
    pub error: Option<Arc<CoordinatorError>>,
    /// Accounting of the last settled pass.
    pub performance_metrics: Option<PerformanceMetrics>,
    /// Generation of the run that produced this state.
    pub generation: u64,
}

impl PeriodState {
    fn clear_data(&mut self) {
        self.current_data = None;
        self.comparison_data = None;
        self.chart_data = None;
        self.percentage_change = 0.0;
        self.previous_amount = 0.0;
        self.performance_metrics = None;
    }

    fn apply(&mut self, outcome: Result<Coordination, CoordinatorError>) {
        self.is_loading = false;
        match outcome {
            Ok(Coordination::Settled(result)) => {
                self.error = None;
                self.current_data = result.current_data;
                self.comparison_data = result.comparison_data;
                self.chart_data = result.chart_data;
                self.percentage_change = result.percentage_change;
                self.previous_amount = result.previous_amount;
                self.performance_metrics = Some(result.performance_metrics);
            }
            Ok(Coordination::Idle { .. }) => {
                self.error = None;
                self.clear_data();
            }
            Err(error) => {
                self.clear_data();
                self.error = Some(Arc::new(error));
            }
        }
    }
}

/// Runs coordination passes for one dashboard view.
///
/// Every run gets a generation number. A run whose generation was
/// superseded by a newer call, or that settles after [`close`](Self::close),
/// is discarded and never touches the published state.
pub struct PeriodQuery<S> {
    coordinator: RequestCoordinator<S>,
    loading: LoadingCoordinator,
    state: watch::Sender<PeriodState>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl<S> std::fmt::Debug for PeriodQuery<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodQuery")
            .field("generation", &self.generation)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<S> PeriodQuery<S>
where
    S: SalesSource + 'static,
{
    /// Creates a query with an empty state.
    pub fn new(coordinator: RequestCoordinator<S>, loading: LoadingOptions) -> Self {
        let (state, _) = watch::channel(PeriodState::default());
        Self {
            coordinator,
            loading: LoadingCoordinator::new(loading),
            state,
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// The latest published state.
    pub fn state(&self) -> PeriodState {
        self.state.borrow().clone()
    }

    /// Receiver for every published state.
    pub fn subscribe(&self) -> watch::Receiver<PeriodState> {
        self.state.subscribe()
    }

    /// Receiver for the flicker-free loading signal.
    pub fn loading_signal(&self) -> watch::Receiver<LoadingSnapshot> {
        self.loading.subscribe()
    }

    /// The coordinator behind this query.
    pub fn coordinator(&self) -> &RequestCoordinator<S> {
        &self.coordinator
    }

    /// Loads a period and publishes the outcome.
    ///
    /// Returns the published state, or `None` when the run was superseded
    /// or the query was closed while it was in flight.
    pub async fn coordinate_period(
        &self,
        start: &str,
        end: &str,
        period: PeriodType,
    ) -> Option<PeriodState> {
        self.run(PeriodRequest {
            start: start.to_owned(),
            end: end.to_owned(),
            period,
        })
        .await
    }

    /// Reruns the last requested period; `None` if there is none.
    pub async fn refetch(&self) -> Option<PeriodState> {
        let request = self.state.borrow().request.clone()?;
        self.run(request).await
    }

    /// Tears the query down: in-flight results are dropped and a pending
    /// loading flip is aborted.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("period query closed");
            self.loading.reset();
        }
    }

    /// Returns `true` after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn run(&self, request: PeriodRequest) -> Option<PeriodState> {
        if self.is_closed() {
            return None;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let range = match DateRange::parse(&request.start, &request.end) {
            Ok(range) => range,
            Err(reason) => {
                debug!(generation, %reason, "period input rejected");
                self.state.send_modify(|state| {
                    state.request = Some(request);
                    state.generation = generation;
                    state.apply(Ok(Coordination::Idle { reason }));
                });
                // Runs still in flight are superseded and will not clear it.
                self.loading.observe([(PERIOD_FLAG, false)]);
                return Some(self.state());
            }
        };

        self.state.send_modify(|state| {
            state.request = Some(request.clone());
            state.generation = generation;
            state.is_loading = true;
        });
        self.loading.observe([(PERIOD_FLAG, true)]);

        let guard = InFlight::enter(&self.in_flight);
        let outcome = self.coordinator.coordinate_range(range, request.period).await;
        drop(guard);

        if self.is_closed() {
            debug!(generation, "query closed, discarding result");
            return None;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "superseded by a newer request, discarding result");
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                self.loading.observe([(PERIOD_FLAG, false)]);
            }
            return None;
        }

        self.state.send_modify(|state| state.apply(outcome));
        self.loading.observe([(PERIOD_FLAG, false)]);
        Some(self.state())
    }
}
