//! Reporting periods and calendar arithmetic.
//!
//! All arithmetic works on [`NaiveDate`] values: calendar dates with no time
//! component and no time zone. Boundary strings are ISO `yyyy-MM-dd`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PeriodError;

/// ISO date format used at every boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Kind of reporting period a dashboard view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Seven consecutive days, compared with the previous seven.
    Weekly,
    /// A calendar month, compared with the previous month.
    Monthly,
}

impl PeriodType {
    /// Returns the period type as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
        }
    }

    /// Granularity of the cache instance holding this period's totals.
    pub const fn totals_granularity(&self) -> Granularity {
        match self {
            PeriodType::Weekly => Granularity::Weekly,
            PeriodType::Monthly => Granularity::Monthly,
        }
    }

    /// Granularity of the cache instance holding this period's breakdown.
    pub const fn breakdown_granularity(&self) -> Granularity {
        match self {
            PeriodType::Weekly => Granularity::Daily,
            PeriodType::Monthly => Granularity::Weekly,
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(PeriodType::Weekly),
            "monthly" => Ok(PeriodType::Monthly),
            other => Err(PeriodError::UnknownPeriodType(other.to_owned())),
        }
    }
}

/// Data granularity a cache instance is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Per-day figures.
    Daily,
    /// Per-week figures.
    Weekly,
    /// Per-month figures.
    Monthly,
}

impl Granularity {
    /// Returns the granularity as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::Inverted { start, end });
        }
        Ok(DateRange { start, end })
    }

    /// Parses a range from two ISO `yyyy-MM-dd` strings.
    ///
    /// Empty strings, malformed dates and inverted ranges are all rejected.
    pub fn parse(start: &str, end: &str) -> Result<Self, PeriodError> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        DateRange::new(start, end)
    }

    /// First day of the range.
    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Start date as an ISO string.
    pub fn start_iso(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// End date as an ISO string.
    pub fn end_iso(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// The period this range is compared against.
    ///
    /// Weekly ranges shift back exactly seven days. Monthly ranges shift each
    /// end back one calendar month, clamping the day to the shorter month
    /// (Mar 31 becomes Feb 28 or Feb 29).
    pub fn comparison(&self, period: PeriodType) -> Result<DateRange, PeriodError> {
        let shift = |date: NaiveDate| match period {
            PeriodType::Weekly => date.checked_sub_days(Days::new(7)),
            PeriodType::Monthly => date.checked_sub_months(Months::new(1)),
        };
        let start = shift(self.start).ok_or(PeriodError::OutOfRange(self.start))?;
        let end = shift(self.end).ok_or(PeriodError::OutOfRange(self.end))?;
        DateRange::new(start, end)
    }

    /// The seven dates of a weekly range, or `None` unless the range spans
    /// exactly seven days.
    pub fn week_days(&self) -> Option<Vec<NaiveDate>> {
        if self.len_days() != 7 {
            return None;
        }
        Some(self.start.iter_days().take(7).collect())
    }

    /// Monday-start weeks covering the range.
    ///
    /// The first week starts at the range start, every following week starts
    /// on a Monday, and the last week ends at the range end. At most
    /// `max_weeks` weeks are produced.
    pub fn monday_weeks(&self, max_weeks: usize) -> Vec<DateRange> {
        let mut weeks = Vec::new();
        let mut cursor = self.start;
        for _ in 0..max_weeks {
            if cursor > self.end {
                break;
            }
            let to_sunday = 6 - u64::from(cursor.weekday().num_days_from_monday());
            let sunday = cursor.checked_add_days(Days::new(to_sunday)).unwrap_or(self.end);
            let week_end = sunday.min(self.end);
            weeks.push(DateRange {
                start: cursor,
                end: week_end,
            });
            match week_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }
        weeks
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_iso(), self.end_iso())
    }
}

/// Parses a single ISO `yyyy-MM-dd` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, PeriodError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PeriodError::Empty);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| PeriodError::InvalidDate(raw.to_owned()))
}

/// Formats a date as ISO `yyyy-MM-dd`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
