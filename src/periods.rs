//! Canonical time-period resolution.
//!
//! Every dashboard metric and backend filter that is scoped to a window goes
//! through [`resolve_period`], so both code paths agree on what "this month"
//! or "this financial year" means. Bounds are closed-inclusive on both ends
//! and carry millisecond precision at end-of-day.
//!
//! The reference instant is always an explicit parameter. Nothing in this
//! module reads a clock.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Symbolic reporting window. Carries no data itself; resolved against a
/// reference instant via [`resolve_period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimePeriod {
    Month,
    Quarter,
    /// Indian fiscal year: April 1 through March 31.
    FinancialYear,
    Year,
}

impl TimePeriod {
    /// Wire/CLI spelling, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Month => "month",
            TimePeriod::Quarter => "quarter",
            TimePeriod::FinancialYear => "financial-year",
            TimePeriod::Year => "year",
        }
    }

    /// All known periods, in reporting order.
    pub const ALL: [TimePeriod; 4] = [
        TimePeriod::Month,
        TimePeriod::Quarter,
        TimePeriod::FinancialYear,
        TimePeriod::Year,
    ];
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown period strings are rejected loudly rather than silently
/// defaulting. A missing period defaults to `month` only where a contract
/// explicitly says so (task filters, CLI).
#[derive(Debug, Error)]
#[error("Unknown time period '{0}'. Expected one of: month, quarter, financial-year, year")]
pub struct ParsePeriodError(pub String);

impl FromStr for TimePeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(TimePeriod::Month),
            "quarter" => Ok(TimePeriod::Quarter),
            "financial-year" => Ok(TimePeriod::FinancialYear),
            "year" => Ok(TimePeriod::Year),
            other => Err(ParsePeriodError(other.to_string())),
        }
    }
}

/// Absolute, closed-inclusive bounds for a resolved period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Human label for reports, e.g. `"June 2025"`, `"Q2 2025"`, `"FY 2025-26"`.
    pub label: String,
}

/// Resolve a symbolic period against an explicit reference instant.
///
/// Pure and deterministic: same `(period, now)` always yields the same
/// bounds. `start <= end` holds for every input.
pub fn resolve_period(period: TimePeriod, now: NaiveDateTime) -> PeriodBounds {
    let today = now.date();
    match period {
        TimePeriod::Month => {
            let start = first_of_month(today.year(), today.month());
            let end = last_of_month(today.year(), today.month());
            PeriodBounds {
                start: start_of_day(start),
                end: end_of_day(end),
                label: start.format("%B %Y").to_string(),
            }
        }
        TimePeriod::Quarter => {
            // Quarters are calendar-aligned: Q1 = Jan-Mar, ... Q4 = Oct-Dec.
            let q = (today.month() - 1) / 3;
            let start_month = q * 3 + 1;
            let start = first_of_month(today.year(), start_month);
            let end = last_of_month(today.year(), start_month + 2);
            PeriodBounds {
                start: start_of_day(start),
                end: end_of_day(end),
                label: format!("Q{} {}", q + 1, today.year()),
            }
        }
        TimePeriod::FinancialYear => {
            // April-March. January-March belongs to the FY that started the
            // previous calendar year.
            let fy_start_year = if today.month() >= 4 {
                today.year()
            } else {
                today.year() - 1
            };
            let start = date(fy_start_year, 4, 1);
            let end = date(fy_start_year + 1, 3, 31);
            PeriodBounds {
                start: start_of_day(start),
                end: end_of_day(end),
                label: format!("FY {}-{:02}", fy_start_year, (fy_start_year + 1) % 100),
            }
        }
        TimePeriod::Year => {
            let start = date(today.year(), 1, 1);
            let end = date(today.year(), 12, 31);
            PeriodBounds {
                start: start_of_day(start),
                end: end_of_day(end),
                label: today.year().to_string(),
            }
        }
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    // Only called with in-range month/day constants.
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    date(year, month, 1)
}

fn last_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    date(next_year, next_month, 1)
        .pred_opt()
        .expect("valid calendar date")
}

fn start_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(0, 0, 0).expect("valid time of day")
}

fn end_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_milli_opt(23, 59, 59, 999).expect("valid time of day")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_month_bounds() {
        let b = resolve_period(TimePeriod::Month, at(2025, 6, 10));
        assert_eq!(b.start, date(2025, 6, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(
            b.end,
            date(2025, 6, 30).and_hms_milli_opt(23, 59, 59, 999).unwrap()
        );
        assert_eq!(b.label, "June 2025");
    }

    #[test]
    fn test_month_bounds_february_leap_year() {
        let b = resolve_period(TimePeriod::Month, at(2024, 2, 15));
        assert_eq!(b.end.date(), date(2024, 2, 29));
    }

    #[test]
    fn test_quarter_bounds() {
        let b = resolve_period(TimePeriod::Quarter, at(2025, 5, 15));
        assert_eq!(b.start.date(), date(2025, 4, 1));
        assert_eq!(b.end.date(), date(2025, 6, 30));
        assert_eq!(b.label, "Q2 2025");

        let q4 = resolve_period(TimePeriod::Quarter, at(2025, 12, 31));
        assert_eq!(q4.start.date(), date(2025, 10, 1));
        assert_eq!(q4.end.date(), date(2025, 12, 31));
        assert_eq!(q4.label, "Q4 2025");
    }

    #[test]
    fn test_year_bounds() {
        let b = resolve_period(TimePeriod::Year, at(2025, 7, 1));
        assert_eq!(b.start.date(), date(2025, 1, 1));
        assert_eq!(b.end.date(), date(2025, 12, 31));
        assert_eq!(b.label, "2025");
    }

    #[test]
    fn test_financial_year_before_april() {
        // February belongs to the FY that started the previous April.
        let b = resolve_period(TimePeriod::FinancialYear, at(2025, 2, 10));
        assert_eq!(b.start, date(2024, 4, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(
            b.end,
            date(2025, 3, 31).and_hms_milli_opt(23, 59, 59, 999).unwrap()
        );
        assert_eq!(b.label, "FY 2024-25");
    }

    #[test]
    fn test_financial_year_from_april() {
        let b = resolve_period(TimePeriod::FinancialYear, at(2025, 6, 10));
        assert_eq!(b.start, date(2025, 4, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(
            b.end,
            date(2026, 3, 31).and_hms_milli_opt(23, 59, 59, 999).unwrap()
        );
        assert_eq!(b.label, "FY 2025-26");
    }

    #[test]
    fn test_financial_year_boundary_days() {
        // April 1 itself starts a new FY; March 31 still belongs to the old one.
        let apr1 = resolve_period(TimePeriod::FinancialYear, at(2025, 4, 1));
        assert_eq!(apr1.start.date(), date(2025, 4, 1));

        let mar31 = resolve_period(TimePeriod::FinancialYear, at(2025, 3, 31));
        assert_eq!(mar31.start.date(), date(2024, 4, 1));
        assert_eq!(mar31.end.date(), date(2025, 3, 31));
    }

    #[test]
    fn test_start_never_after_end() {
        let samples = [
            at(2024, 1, 1),
            at(2024, 2, 29),
            at(2024, 12, 31),
            at(2025, 3, 31),
            at(2025, 4, 1),
            at(2025, 6, 10),
            at(2026, 9, 30),
        ];
        for period in TimePeriod::ALL {
            for now in samples {
                let b = resolve_period(period, now);
                assert!(
                    b.start <= b.end,
                    "{period} at {now}: start {} > end {}",
                    b.start,
                    b.end
                );
            }
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let now = at(2025, 8, 29);
        assert_eq!(
            resolve_period(TimePeriod::Quarter, now),
            resolve_period(TimePeriod::Quarter, now)
        );
    }

    #[test]
    fn test_period_parse_round_trip() {
        for period in TimePeriod::ALL {
            assert_eq!(period.as_str().parse::<TimePeriod>().unwrap(), period);
        }
        assert!("fortnight".parse::<TimePeriod>().is_err());
    }
}
