//! Coordination failures.

use std::fmt;

use thiserror::Error;

use salesdash_core::{DateRange, FetchError};

use super::plan::FetchKind;
use crate::retry::RetryError;

/// A fetch that produced no data.
#[derive(Debug)]
pub struct FetchFailure {
    /// Which fetch failed.
    pub kind: FetchKind,
    /// The retry manager's verdict.
    pub error: RetryError<FetchError>,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.error)
    }
}

/// Terminal failure of a coordination pass.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Every fetch of the pass failed; there is nothing to render.
    #[error("all {} upstream calls failed for {range}: {}", .failures.len(), join(.failures))]
    AllCallsFailed {
        /// Requested range.
        range: DateRange,
        /// One failure per fetch.
        failures: Vec<FetchFailure>,
    },
}

impl CoordinatorError {
    /// Per-fetch failures.
    pub fn failures(&self) -> &[FetchFailure] {
        match self {
            CoordinatorError::AllCallsFailed { failures, .. } => failures,
        }
    }
}

fn join(failures: &[FetchFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
