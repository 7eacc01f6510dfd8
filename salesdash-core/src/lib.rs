#![warn(missing_docs)]
//! # salesdash-core
//!
//! Core types for the salesdash fetch layer: the pieces every other crate
//! agrees on, with no runtime or I/O of their own.
//!
//! - **Periods** - [`PeriodType`], [`DateRange`] and calendar arithmetic
//! - **Keys** - [`CacheKey`] and [`generate_key`], stable under parameter order
//! - **Lookups** - [`CacheState`], [`CacheStatus`], [`CacheTag`]
//! - **Schemas** - [`SalesSummary`], [`Breakdown`] with boundary coercion
//! - **Upstream** - the [`SalesSource`] trait and [`FetchError`]

pub mod error;
pub mod key;
pub mod label;
pub mod period;
pub mod response;
pub mod source;
pub mod value;

pub use error::{FetchError, PeriodError};
pub use key::{CacheKey, KeyPart, generate_key};
pub use label::CacheTag;
pub use period::{DATE_FORMAT, DateRange, Granularity, PeriodType, format_date, parse_date};
pub use response::{
    BranchCard, Breakdown, BreakdownEntry, Envelope, Percentage, SalesSummary, SalesTotals, Tally,
};
pub use source::{BreakdownRequest, SalesSource};
pub use value::{CacheState, CacheStatus};
