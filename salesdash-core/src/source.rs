//! The upstream seam: the [`SalesSource`] trait and breakdown requests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::period::{DateRange, format_date};

/// The upstream sales API, seen as two black-box calls.
///
/// Implementations return the raw `data` payload of a successful response;
/// decoding into typed schemas happens in the caller so that exactly what the
/// upstream sent can be cached.
///
/// # Examples
///
/// ```rust,ignore
/// use salesdash_core::{SalesSource, DateRange, BreakdownRequest, FetchError};
///
/// struct Fixed(serde_json::Value);
///
/// #[async_trait::async_trait]
/// impl SalesSource for Fixed {
///     async fn fetch_totals(&self, _range: &DateRange) -> Result<serde_json::Value, FetchError> {
///         Ok(self.0.clone())
///     }
///     async fn fetch_breakdown(&self, _req: &BreakdownRequest) -> Result<serde_json::Value, FetchError> {
///         Ok(serde_json::json!({}))
///     }
/// }
/// ```
#[async_trait]
pub trait SalesSource: Send + Sync {
    /// Fetches aggregated totals and branch cards for a date range.
    async fn fetch_totals(&self, range: &DateRange) -> Result<Value, FetchError>;

    /// Fetches a batched breakdown for a set of dates or weeks.
    async fn fetch_breakdown(&self, request: &BreakdownRequest) -> Result<Value, FetchError>;
}

#[async_trait]
impl<T> SalesSource for std::sync::Arc<T>
where
    T: SalesSource + ?Sized,
{
    async fn fetch_totals(&self, range: &DateRange) -> Result<Value, FetchError> {
        self.as_ref().fetch_totals(range).await
    }

    async fn fetch_breakdown(&self, request: &BreakdownRequest) -> Result<Value, FetchError> {
        self.as_ref().fetch_breakdown(request).await
    }
}

/// A single batched breakdown call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakdownRequest {
    /// Per-day buckets; the response is keyed by ISO date.
    Days(Vec<NaiveDate>),
    /// Per-week buckets; the response is keyed by the week's start date.
    Weeks(Vec<DateRange>),
}

impl BreakdownRequest {
    /// Keys the upstream response is expected to use, in chart order.
    pub fn bucket_keys(&self) -> Vec<String> {
        match self {
            BreakdownRequest::Days(days) => days.iter().copied().map(format_date).collect(),
            BreakdownRequest::Weeks(weeks) => weeks.iter().map(DateRange::start_iso).collect(),
        }
    }

    /// Number of buckets requested.
    pub fn len(&self) -> usize {
        match self {
            BreakdownRequest::Days(days) => days.len(),
            BreakdownRequest::Weeks(weeks) => weeks.len(),
        }
    }

    /// Returns `true` if nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON body sent to the breakdown endpoint.
    ///
    /// `{"dates": ["2025-09-02", ...]}` or
    /// `{"weeks": [{"id": "2025-09-01", "start_date": ..., "end_date": ...}]}`.
    pub fn to_body(&self) -> Value {
        #[derive(Serialize)]
        struct Week {
            id: String,
            start_date: String,
            end_date: String,
        }

        match self {
            BreakdownRequest::Days(_) => serde_json::json!({ "dates": self.bucket_keys() }),
            BreakdownRequest::Weeks(weeks) => {
                let weeks: Vec<Week> = weeks
                    .iter()
                    .map(|week| Week {
                        id: week.start_iso(),
                        start_date: week.start_iso(),
                        end_date: week.end_iso(),
                    })
                    .collect();
                serde_json::json!({ "weeks": weeks })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_days_body() {
        let range = DateRange::parse("2025-01-01", "2025-01-07").unwrap();
        let request = BreakdownRequest::Days(range.week_days().unwrap());
        assert_eq!(request.len(), 7);
        assert_eq!(request.to_body()["dates"][0], json!("2025-01-01"));
    }

    #[test]
    fn test_weeks_body() {
        let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
        let request = BreakdownRequest::Weeks(range.monday_weeks(10));
        let body = request.to_body();
        assert_eq!(body["weeks"][1]["id"], json!("2025-01-06"));
        assert_eq!(body["weeks"][1]["end_date"], json!("2025-01-12"));
        assert_eq!(request.bucket_keys()[0], "2025-01-01");
    }
}
