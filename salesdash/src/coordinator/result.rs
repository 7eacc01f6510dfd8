//! Output of a coordination pass.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use salesdash_core::{
    Breakdown, BreakdownRequest, CacheStatus, DateRange, Granularity, PeriodError, PeriodType,
    SalesSummary,
};

/// How one logical fetch was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchProvenance {
    /// What the cache lookup found.
    pub status: CacheStatus,
    /// Whether a network call was issued in this pass.
    pub network_call: bool,
    /// Whether the fetch produced data.
    pub succeeded: bool,
}

impl FetchProvenance {
    /// Answered from cache without touching the network.
    pub fn served_from_cache(&self) -> bool {
        self.succeeded && !self.network_call
    }
}

/// Timing and call accounting for one coordination pass.
///
/// Advisory only; nothing reads these values to make decisions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceMetrics {
    /// Wall-clock time of the whole pass.
    pub total: Duration,
    /// Time spent waiting on the concurrent fetch phase.
    pub concurrent_phase: Duration,
    /// What the concurrent phase would have cost run one fetch after another.
    pub estimated_sequential: Duration,
    /// Network calls issued (retries not counted).
    pub network_calls: usize,
    /// Fetches answered from cache.
    pub cache_hits: usize,
    /// Current totals fetch.
    pub current: FetchProvenance,
    /// Comparison totals fetch.
    pub comparison: FetchProvenance,
    /// Breakdown fetch, `None` when skipped.
    pub breakdown: Option<FetchProvenance>,
}

impl PerformanceMetrics {
    /// Share of the sequential estimate saved by the concurrent phase, in
    /// percent.
    pub fn efficiency_gain(&self) -> f64 {
        let sequential = self.estimated_sequential.as_secs_f64();
        if sequential <= 0.0 {
            return 0.0;
        }
        (sequential - self.concurrent_phase.as_secs_f64()) / sequential * 100.0
    }
}

/// One bucket of the chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Bucket key: a date, or a week's start date.
    pub key: String,
    /// Bucket total, `0` when the upstream omitted the bucket.
    pub total: f64,
    /// Upstream detail for the bucket.
    pub details: Value,
}

/// Breakdown of the current range, in calendar order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Bucket granularity (daily for weekly views, weekly for monthly views).
    pub granularity: Granularity,
    /// One point per requested bucket.
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Lines up breakdown buckets with the requested bucket order.
    pub fn from_breakdown(
        granularity: Granularity,
        request: &BreakdownRequest,
        breakdown: &Breakdown,
    ) -> Self {
        let points = request
            .bucket_keys()
            .into_iter()
            .map(|key| {
                let entry = breakdown.0.get(&key);
                ChartPoint {
                    total: entry.map_or(0.0, |entry| entry.total),
                    details: entry.map_or(Value::Null, |entry| entry.details.clone()),
                    key,
                }
            })
            .collect();
        Self { granularity, points }
    }

    /// Sum of all bucket totals.
    pub fn total(&self) -> f64 {
        self.points.iter().map(|point| point.total).sum()
    }
}

/// Everything the dashboard renders for one period.
///
/// Equality ignores [`performance_metrics`](Self::performance_metrics).
#[derive(Debug, Clone)]
pub struct UnifiedPeriodResult {
    /// Period type.
    pub period: PeriodType,
    /// Requested range.
    pub current_range: DateRange,
    /// Range the current one is compared against.
    pub comparison_range: DateRange,
    /// Totals and branch cards for the requested range.
    pub current_data: Option<SalesSummary>,
    /// Totals and branch cards for the comparison range.
    pub comparison_data: Option<SalesSummary>,
    /// Breakdown chart; `None` when the breakdown failed or was skipped.
    pub chart_data: Option<ChartSeries>,
    /// Change against the comparison total, in percent with one decimal.
    pub percentage_change: f64,
    /// Comparison total, `0` when unavailable.
    pub previous_amount: f64,
    /// Timing and call accounting.
    pub performance_metrics: PerformanceMetrics,
}

impl PartialEq for UnifiedPeriodResult {
    fn eq(&self, other: &Self) -> bool {
        self.period == other.period
            && self.current_range == other.current_range
            && self.comparison_range == other.comparison_range
            && self.current_data == other.current_data
            && self.comparison_data == other.comparison_data
            && self.chart_data == other.chart_data
            && self.percentage_change == other.percentage_change
            && self.previous_amount == other.previous_amount
    }
}

impl UnifiedPeriodResult {
    /// Current total, `0` when unavailable.
    pub fn current_amount(&self) -> f64 {
        self.current_data.as_ref().map_or(0.0, SalesSummary::total)
    }

    /// Whether any of the three pieces is missing.
    pub fn is_degraded(&self) -> bool {
        self.current_data.is_none() || self.comparison_data.is_none() || self.chart_data.is_none()
    }
}

/// Outcome of a coordination pass that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Coordination {
    /// The input was empty or invalid; nothing was fetched.
    Idle {
        /// Why the input was rejected.
        reason: PeriodError,
    },
    /// All fetches settled and at least one produced data.
    Settled(Box<UnifiedPeriodResult>),
}

impl Coordination {
    /// The settled result, if any.
    pub fn settled(self) -> Option<UnifiedPeriodResult> {
        match self {
            Coordination::Settled(result) => Some(*result),
            Coordination::Idle { .. } => None,
        }
    }

    /// Borrow the settled result, if any.
    pub fn as_settled(&self) -> Option<&UnifiedPeriodResult> {
        match self {
            Coordination::Settled(result) => Some(result),
            Coordination::Idle { .. } => None,
        }
    }

    /// Returns `true` for an idle outcome.
    pub fn is_idle(&self) -> bool {
        matches!(self, Coordination::Idle { .. })
    }
}

/// Change from `previous` to `current` in percent, rounded to one decimal.
///
/// Halves round away from zero, so `6.25` becomes `6.3` and `-6.25`
/// becomes `-6.3`. A zero previous total yields `0`, never an infinity or NaN.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return 0.0;
    }
    let change = (current - previous) / previous * 100.0;
    (change * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_halves_round_away_from_zero() {
        assert_eq!(percentage_change(1088.0, 1024.0), 6.3);
        assert_eq!(percentage_change(960.0, 1024.0), -6.3);
    }
    use serde_json::json;

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(180_000.0, 150_000.0), 20.0);
        assert_eq!(percentage_change(100.0, 300.0), -66.7);
        assert_eq!(percentage_change(5.0, 0.0), 0.0);
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_chart_fills_missing_buckets() {
        let range = DateRange::parse("2025-09-02", "2025-09-08").unwrap();
        let request = BreakdownRequest::Days(range.week_days().unwrap());
        let breakdown = Breakdown::from_value(json!({
            "2025-09-02": {"total": 10, "details": {"orders": 2}},
            "2025-09-04": "5",
        }))
        .unwrap();

        let chart = ChartSeries::from_breakdown(Granularity::Daily, &request, &breakdown);
        assert_eq!(chart.points.len(), 7);
        assert_eq!(chart.points[0].details, json!({"orders": 2}));
        assert_eq!(chart.points[1].total, 0.0);
        assert_eq!(chart.points[2].total, 5.0);
        assert_eq!(chart.total(), 15.0);
    }

    #[test]
    fn test_efficiency_gain() {
        let metrics = PerformanceMetrics {
            concurrent_phase: Duration::from_millis(200),
            estimated_sequential: Duration::from_millis(600),
            ..Default::default()
        };
        assert!((metrics.efficiency_gain() - 66.666).abs() < 0.01);
        assert_eq!(PerformanceMetrics::default().efficiency_gain(), 0.0);
    }
}
