//! Deriving the three logical fetches of a period.

use salesdash_core::{
    BreakdownRequest, CacheKey, CacheTag, DateRange, Granularity, PeriodError, PeriodType,
};

/// Cache key prefix for totals responses.
pub const TOTALS_PREFIX: &str = "sales_totals";
/// Cache key prefix for breakdown responses.
pub const BREAKDOWN_PREFIX: &str = "sales_breakdown";

/// The three logical fetches of one coordination pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// Totals for the requested range.
    CurrentTotals,
    /// Totals for the comparison range.
    ComparisonTotals,
    /// Batched per-day or per-week breakdown of the requested range.
    Breakdown,
}

impl FetchKind {
    /// Label used for retry logs, metrics and cache tags.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FetchKind::CurrentTotals => "current_totals",
            FetchKind::ComparisonTotals => "comparison_totals",
            FetchKind::Breakdown => "breakdown",
        }
    }

    pub(crate) fn tag(&self) -> CacheTag {
        CacheTag::new_static(self.as_str())
    }
}

/// What to call upstream for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    /// Totals endpoint for a range.
    Totals(DateRange),
    /// Breakdown endpoint for a batch of buckets.
    Breakdown(BreakdownRequest),
}

/// One logical fetch: where it is cached and what it calls.
#[derive(Debug, Clone)]
pub struct PlannedFetch {
    /// Which of the three fetches this is.
    pub kind: FetchKind,
    /// Cache instance holding the response.
    pub granularity: Granularity,
    /// Cache key of the response.
    pub key: CacheKey,
    /// Upstream call issued on a miss.
    pub call: FetchCall,
}

/// Everything a coordination pass needs to know before touching the network.
///
/// # Examples
///
/// ```
/// use salesdash::coordinator::PeriodRequestPlan;
/// use salesdash_core::{DateRange, PeriodType};
///
/// let range = DateRange::parse("2025-09-02", "2025-09-08").unwrap();
/// let plan = PeriodRequestPlan::new(range, PeriodType::Weekly, 10).unwrap();
/// assert_eq!(plan.comparison().to_string(), "2025-08-26..2025-09-01");
/// assert_eq!(plan.breakdown().map(|fetch| fetch.kind.as_str()), Some("breakdown"));
/// ```
#[derive(Debug, Clone)]
pub struct PeriodRequestPlan {
    period: PeriodType,
    current: PlannedFetch,
    comparison: PlannedFetch,
    breakdown: Option<PlannedFetch>,
    current_range: DateRange,
    comparison_range: DateRange,
}

impl PeriodRequestPlan {
    /// Plans the fetches for `range`.
    ///
    /// Weekly ranges get a per-day breakdown only when they span exactly
    /// seven days; monthly ranges get Monday-start weeks, at most
    /// `max_weeks` of them.
    pub fn new(range: DateRange, period: PeriodType, max_weeks: usize) -> Result<Self, PeriodError> {
        let comparison_range = range.comparison(period)?;
        let totals_granularity = period.totals_granularity();

        let breakdown_request = match period {
            PeriodType::Weekly => range.week_days().map(BreakdownRequest::Days),
            PeriodType::Monthly => {
                let weeks = range.monday_weeks(max_weeks);
                (!weeks.is_empty()).then_some(BreakdownRequest::Weeks(weeks))
            }
        };

        Ok(Self {
            period,
            current: PlannedFetch {
                kind: FetchKind::CurrentTotals,
                granularity: totals_granularity,
                key: totals_key(&range, period),
                call: FetchCall::Totals(range),
            },
            comparison: PlannedFetch {
                kind: FetchKind::ComparisonTotals,
                granularity: totals_granularity,
                key: totals_key(&comparison_range, period),
                call: FetchCall::Totals(comparison_range),
            },
            breakdown: breakdown_request.map(|request| PlannedFetch {
                kind: FetchKind::Breakdown,
                granularity: period.breakdown_granularity(),
                key: breakdown_key(&range, period),
                call: FetchCall::Breakdown(request),
            }),
            current_range: range,
            comparison_range,
        })
    }

    /// Period type.
    pub fn period(&self) -> PeriodType {
        self.period
    }

    /// Requested range.
    pub fn current(&self) -> DateRange {
        self.current_range
    }

    /// Comparison range.
    pub fn comparison(&self) -> DateRange {
        self.comparison_range
    }

    /// Current totals fetch.
    pub fn current_fetch(&self) -> &PlannedFetch {
        &self.current
    }

    /// Comparison totals fetch.
    pub fn comparison_fetch(&self) -> &PlannedFetch {
        &self.comparison
    }

    /// Breakdown fetch, `None` when it is skipped.
    pub fn breakdown(&self) -> Option<&PlannedFetch> {
        self.breakdown.as_ref()
    }
}

/// Cache key for a totals response.
pub fn totals_key(range: &DateRange, period: PeriodType) -> CacheKey {
    CacheKey::new(
        TOTALS_PREFIX,
        [
            ("start_date", range.start_iso()),
            ("end_date", range.end_iso()),
            ("period", period.as_str().to_owned()),
        ],
    )
}

/// Cache key for a breakdown response.
pub fn breakdown_key(range: &DateRange, period: PeriodType) -> CacheKey {
    CacheKey::new(
        BREAKDOWN_PREFIX,
        [
            ("start_date", range.start_iso()),
            ("end_date", range.end_iso()),
            ("period", period.as_str().to_owned()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(start: &str, end: &str, period: PeriodType) -> PeriodRequestPlan {
        PeriodRequestPlan::new(DateRange::parse(start, end).unwrap(), period, 10).unwrap()
    }

    #[test]
    fn test_weekly_plan() {
        let plan = plan("2025-09-02", "2025-09-08", PeriodType::Weekly);
        assert_eq!(plan.comparison().start_iso(), "2025-08-26");
        assert_eq!(plan.comparison().end_iso(), "2025-09-01");
        assert_eq!(plan.current_fetch().granularity, Granularity::Weekly);

        let breakdown = plan.breakdown().unwrap();
        assert_eq!(breakdown.granularity, Granularity::Daily);
        match &breakdown.call {
            FetchCall::Breakdown(request) => assert_eq!(request.len(), 7),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_short_weekly_range_skips_breakdown() {
        let plan = plan("2025-09-02", "2025-09-05", PeriodType::Weekly);
        assert!(plan.breakdown().is_none());
    }

    #[test]
    fn test_monthly_plan_uses_monday_weeks() {
        let plan = plan("2025-01-01", "2025-01-31", PeriodType::Monthly);
        assert_eq!(plan.comparison().to_string(), "2024-12-01..2024-12-31");
        let breakdown = plan.breakdown().unwrap();
        assert_eq!(breakdown.granularity, Granularity::Weekly);
        match &breakdown.call {
            FetchCall::Breakdown(BreakdownRequest::Weeks(weeks)) => {
                assert_eq!(weeks.len(), 5);
                assert_eq!(weeks[4].end_iso(), "2025-01-31");
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_monthly_comparison_clamps_day() {
        let plan = plan("2025-03-31", "2025-03-31", PeriodType::Monthly);
        assert_eq!(plan.comparison().start_iso(), "2025-02-28");
    }

    #[test]
    fn test_keys_are_stable_and_distinct() {
        let plan = plan("2025-01-01", "2025-01-07", PeriodType::Weekly);
        assert_eq!(
            plan.current_fetch().key.as_str(),
            "sales_totals:end_date=2025-01-07&period=weekly&start_date=2025-01-01"
        );
        assert_ne!(plan.current_fetch().key, plan.comparison_fetch().key);
    }
}
