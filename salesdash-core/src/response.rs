//! Typed schemas for the upstream sales API.
//!
//! The upstream returns loosely typed JSON: numbers sometimes arrive as
//! strings, fields go missing on empty days. Everything is coerced here, at
//! the boundary, with one documented rule:
//!
//! - numeric fields accept JSON numbers or numeric strings (thousands
//!   separators `,` are ignored); anything else, including a missing field
//!   or `null`, becomes `0`
//! - string fields default to `""`
//! - maps default to empty
//!
//! Coordinator code works with these types only and never re-checks for
//! missing fields.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// The `{success, data}` wrapper every upstream endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Envelope {
    /// Whether the upstream considers the request successful.
    #[serde(default)]
    pub success: bool,
    /// The payload; absent on failures.
    #[serde(default)]
    pub data: Option<Value>,
    /// Optional failure description.
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Unwraps the payload, turning `success: false` into [`FetchError::Api`].
    pub fn into_data(self) -> Result<Value, FetchError> {
        if !self.success {
            return Err(FetchError::Api(
                self.message
                    .unwrap_or_else(|| "upstream reported failure".to_owned()),
            ));
        }
        self.data
            .ok_or_else(|| FetchError::Decode("missing data field".to_owned()))
    }
}

/// Aggregated figures for one date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SalesSummary {
    /// Totals across all branches.
    #[serde(default)]
    pub sales: SalesTotals,
    /// Per-branch cards keyed by branch name, in upstream order.
    #[serde(default)]
    pub cards: IndexMap<String, BranchCard>,
}

impl SalesSummary {
    /// Decodes the `data` payload of a totals response.
    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Grand total for the range.
    #[inline]
    pub fn total(&self) -> f64 {
        self.sales.total
    }
}

/// Sales totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SalesTotals {
    /// Total including taxes.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    /// Total before taxes.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub subtotal: f64,
}

/// Figures for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BranchCard {
    /// Accounts still open.
    #[serde(default)]
    pub open_accounts: Tally,
    /// Tickets already closed.
    #[serde(default)]
    pub closed_ticket: Tally,
    /// Average ticket amount.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_ticket: f64,
    /// Change indicator shown next to the branch.
    #[serde(default)]
    pub percentage: Percentage,
    /// Date the card refers to.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    /// Upstream store identifier.
    #[serde(default, deserialize_with = "lenient_string")]
    pub store_id: String,
}

/// A count and an amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Tally {
    /// Number of items.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    /// Amount of money.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub money: f64,
}

/// Percentage indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Percentage {
    /// Icon name (e.g. `up`, `down`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub icon: String,
    /// Percentage value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub qty: f64,
}

/// One bucket of a breakdown response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BreakdownEntry {
    /// Total for the bucket.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    /// Upstream-specific detail, passed through untouched.
    #[serde(default)]
    pub details: Value,
}

/// Breakdown buckets keyed by date (weekly views) or by week start date
/// (monthly views).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Breakdown(pub BTreeMap<String, BreakdownEntry>);

impl Breakdown {
    /// Decodes the `data` payload of a breakdown response.
    ///
    /// A bucket may be a full `{total, details}` object or a bare number.
    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        let Value::Object(map) = value else {
            return Err(FetchError::Decode(
                "breakdown payload is not an object".to_owned(),
            ));
        };
        let mut buckets = BTreeMap::new();
        for (key, raw) in map {
            let entry = match raw {
                Value::Object(_) => serde_json::from_value(raw)?,
                other => BreakdownEntry {
                    total: coerce_f64(&other),
                    details: Value::Null,
                },
            };
            buckets.insert(key, entry);
        }
        Ok(Breakdown(buckets))
    }

    /// Total of the bucket with the given key, `0` when missing.
    pub fn total_for(&self, key: &str) -> f64 {
        self.0.get(key).map_or(0.0, |entry| entry.total)
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no buckets.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Non-finite results (`"NaN"`, `"inf"`, `"1e400"`) read as `0`.
fn coerce_f64(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if number.is_finite() { number } else { 0.0 }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
