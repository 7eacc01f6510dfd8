//! Error types shared across the fetch layer.

use chrono::NaiveDate;
use thiserror::Error;

/// Failure of a single upstream fetch.
///
/// The rendered messages are what retry classification inspects, so each
/// variant's text carries the words a classifier looks for (`timeout`,
/// `connection`, `status: 503`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The upstream answered with a non-success HTTP status.
    #[error("HTTP error! status: {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// The request did not complete in time.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// A connection to the upstream could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream answered `success: false`; carries its message.
    #[error("{0}")]
    Api(String),

    /// The response body did not match the expected shape.
    #[error("invalid response payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Returns the HTTP status if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Rejected reporting period input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// A boundary date was empty.
    #[error("date is empty")]
    Empty,

    /// A boundary date was not a valid `yyyy-MM-dd` calendar date.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// The start date is after the end date.
    #[error("start date {start} is after end date {end}")]
    Inverted {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Date arithmetic left the supported calendar range.
    #[error("date {0} cannot be shifted")]
    OutOfRange(NaiveDate),

    /// The period type name is not recognized.
    #[error("unknown period type: {0}")]
    UnknownPeriodType(String),
}
