//! Reporting period identifier parsing.
//!
//! Period identifiers name an inclusive date range in a compact form used by the
//! comparison endpoints: `2024` (calendar year), `2024-05` (month), `2024-Q2`
//! (quarter), `2024-W22` (ISO-ish week starting Monday), plus the relative
//! identifiers `YTD` and `MTD`.

use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref YEAR_RE: Regex = Regex::new(r"^(\d{4})$").unwrap();
    static ref MONTH_RE: Regex = Regex::new(r"^(\d{4})-(\d{2})$").unwrap();
    static ref QUARTER_RE: Regex = Regex::new(r"^(\d{4})-Q([1-4])$").unwrap();
    static ref WEEK_RE: Regex = Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap();
}

/// Error type for period identifier parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodParseError {
    #[error("Invalid period identifier: {0}")]
    InvalidFormat(String),
    #[error("Period identifier {0} is out of range")]
    OutOfRange(String),
}

/// An inclusive date range resolved from a period identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Parses a period identifier into an inclusive date range.
///
/// `YTD` and `MTD` are resolved against `today`, which callers pass explicitly so
/// the result is reproducible in tests.
pub fn parse_period(identifier: &str, today: NaiveDate) -> Result<PeriodRange, PeriodParseError> {
    if identifier == "YTD" {
        let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap();
        return Ok(PeriodRange { start, end: today });
    }

    if identifier == "MTD" {
        let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
        return Ok(PeriodRange { start, end: today });
    }

    if let Some(caps) = QUARTER_RE.captures(identifier) {
        let year: i32 = caps[1].parse().unwrap();
        let quarter: u32 = caps[2].parse().unwrap();
        let start = NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
            .ok_or_else(|| PeriodParseError::OutOfRange(identifier.to_string()))?;
        let end = add_months(start, 3) - Duration::days(1);
        return Ok(PeriodRange { start, end });
    }

    if let Some(caps) = WEEK_RE.captures(identifier) {
        let year: i32 = caps[1].parse().unwrap();
        let week: i64 = caps[2].parse().unwrap();
        if !(1..=53).contains(&week) {
            return Err(PeriodParseError::OutOfRange(identifier.to_string()));
        }
        // Week 1 is the week containing January 1st, weeks start on Monday.
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        let first_monday = jan1 - Duration::days(jan1.weekday().num_days_from_monday() as i64);
        let start = first_monday + Duration::weeks(week - 1);
        return Ok(PeriodRange {
            start,
            end: start + Duration::days(6),
        });
    }

    if let Some(caps) = MONTH_RE.captures(identifier) {
        let year: i32 = caps[1].parse().unwrap();
        let month: u32 = caps[2].parse().unwrap();
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| PeriodParseError::OutOfRange(identifier.to_string()))?;
        let end = add_months(start, 1) - Duration::days(1);
        return Ok(PeriodRange { start, end });
    }

    if let Some(caps) = YEAR_RE.captures(identifier) {
        let year: i32 = caps[1].parse().unwrap();
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
        return Ok(PeriodRange { start, end });
    }

    Err(PeriodParseError::InvalidFormat(identifier.to_string()))
}

/// Adds whole months to a date, clamping the day to the target month's length.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap()
    };
    (next - NaiveDate::from_ymd_opt(year, month, 1).unwrap()).num_days() as u32
}

/// Returns the Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Returns the first day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap()
}

/// Returns the first day of the quarter containing `date`.
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let quarter_month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), quarter_month, 1).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_year() {
        let range = parse_period("2024", d(2025, 6, 1)).unwrap();
        assert_eq!(range.start, d(2024, 1, 1));
        assert_eq!(range.end, d(2024, 12, 31));
    }

    #[test]
    fn test_parse_month() {
        let range = parse_period("2024-02", d(2025, 6, 1)).unwrap();
        assert_eq!(range.start, d(2024, 2, 1));
        assert_eq!(range.end, d(2024, 2, 29)); // leap year
    }

    #[test]
    fn test_parse_quarter() {
        let range = parse_period("2024-Q1", d(2025, 6, 1)).unwrap();
        assert_eq!(range.start, d(2024, 1, 1));
        assert_eq!(range.end, d(2024, 3, 31));

        let range = parse_period("2024-Q4", d(2025, 6, 1)).unwrap();
        assert_eq!(range.start, d(2024, 10, 1));
        assert_eq!(range.end, d(2024, 12, 31));
    }

    #[test]
    fn test_parse_week_starts_monday() {
        let range = parse_period("2024-W22", d(2025, 6, 1)).unwrap();
        assert_eq!(range.start.weekday(), Weekday::Mon);
        assert_eq!(range.end - range.start, Duration::days(6));
    }

    #[test]
    fn test_parse_ytd_and_mtd() {
        let today = d(2024, 5, 17);
        let ytd = parse_period("YTD", today).unwrap();
        assert_eq!(ytd.start, d(2024, 1, 1));
        assert_eq!(ytd.end, today);

        let mtd = parse_period("MTD", today).unwrap();
        assert_eq!(mtd.start, d(2024, 5, 1));
        assert_eq!(mtd.end, today);
    }

    #[test]
    fn test_parse_invalid() {
        let today = d(2024, 5, 17);
        assert!(matches!(
            parse_period("last-tuesday", today),
            Err(PeriodParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_period("2024-13", today),
            Err(PeriodParseError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_period("2024-W54", today),
            Err(PeriodParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(add_months(d(2024, 1, 31), 1), d(2024, 2, 29));
        assert_eq!(add_months(d(2023, 1, 31), 1), d(2023, 2, 28));
        assert_eq!(add_months(d(2024, 11, 15), 2), d(2025, 1, 15));
    }

    #[test]
    fn test_bucket_starts() {
        assert_eq!(week_start(d(2024, 5, 17)), d(2024, 5, 13));
        assert_eq!(month_start(d(2024, 5, 17)), d(2024, 5, 1));
        assert_eq!(quarter_start(d(2024, 5, 17)), d(2024, 4, 1));
        assert_eq!(quarter_start(d(2024, 12, 31)), d(2024, 10, 1));
    }
}
