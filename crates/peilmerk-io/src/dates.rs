//! Conversion between calendar dates and day numbers.
//!
//! Day numbers count days since 1970-01-01, the time axis of every series.

use chrono::{Datelike, NaiveDate, TimeDelta};

fn epoch() -> NaiveDate {
    // chrono's default date is 1970-01-01
    NaiveDate::default()
}

/// Parse a date string in "YYYY-MM-DD" format.
///
/// # Errors
///
/// Returns the chrono parse error for anything else.
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}

/// Parse a "YYYY-MM-DD" date straight into a day number.
///
/// # Errors
///
/// As for [`parse_date`].
pub fn parse_days(s: &str) -> Result<f64, chrono::ParseError> {
    parse_date(s).map(days_since_epoch)
}

/// Days between the epoch and `date`; negative before 1970.
#[must_use]
pub fn days_since_epoch(date: NaiveDate) -> f64 {
    date.signed_duration_since(epoch()).num_days() as f64
}

/// Calendar date containing day number `days`, or `None` when it lies
/// outside chrono's range.
#[must_use]
pub fn date_from_days(days: f64) -> Option<NaiveDate> {
    if !days.is_finite() || days.abs() > 1e8 {
        return None;
    }
    epoch().checked_add_signed(TimeDelta::try_days(days.floor() as i64)?)
}

/// Calendar year containing day number `days`.
#[must_use]
pub fn year_of(days: f64) -> Option<i32> {
    date_from_days(days).map(|d| d.year())
}
