//! Civil date range for loading events.

use chrono::{Datelike, Duration, Months, NaiveDate};

/// How far past the end of a range month iteration may run.
const MONTH_SAFETY_CAP: u32 = 12;

/// Inclusive range of civil dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Range of `days` days starting at `start`.
    pub fn days_from(start: NaiveDate, days: i64) -> Self {
        DateRange {
            start,
            end: start + Duration::days(days.max(1) - 1),
        }
    }

    /// Parse YYYY-MM-DD bounds. `from` defaults to `today`, `to` to `from + 7 days`.
    pub fn from_args(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<Self, String> {
        let start = match from {
            Some(s) => parse_date(s)?,
            None => today,
        };
        let end = match to {
            Some(s) => parse_date(s)?,
            None => start + Duration::days(7),
        };
        if end < start {
            return Err(format!("Range end {end} is before start {start}"));
        }
        Ok(DateRange { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_single_month(&self) -> bool {
        self.start.year() == self.end.year() && self.start.month() == self.end.month()
    }

    /// First-of-month anchors covering the range.
    ///
    /// Iteration stops after the month of `end`, and never runs more than
    /// twelve months past it.
    pub fn month_anchors(&self) -> Vec<NaiveDate> {
        let first = first_of_month(self.start);
        if self.is_single_month() {
            return vec![first];
        }

        let last = first_of_month(self.end);
        let cap = last
            .checked_add_months(Months::new(MONTH_SAFETY_CAP))
            .unwrap_or(last);

        let mut anchors = Vec::new();
        let mut month = first;
        while month <= last && month <= cap {
            anchors.push(month);
            match month.checked_add_months(Months::new(1)) {
                Some(next) => month = next,
                None => break,
            }
        }
        anchors
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn single_month_has_one_anchor() {
        let range = DateRange::new(d(2024, 3, 5), d(2024, 3, 28));
        assert_eq!(range.month_anchors(), vec![d(2024, 3, 1)]);
    }

    #[test]
    fn spanning_range_visits_every_month() {
        let range = DateRange::new(d(2024, 1, 15), d(2024, 3, 10));
        assert_eq!(
            range.month_anchors(),
            vec![d(2024, 1, 1), d(2024, 2, 1), d(2024, 3, 1)]
        );
    }

    #[test]
    fn year_boundary() {
        let range = DateRange::new(d(2024, 12, 30), d(2025, 1, 2));
        assert_eq!(range.month_anchors(), vec![d(2024, 12, 1), d(2025, 1, 1)]);
    }

    #[test]
    fn contains_is_inclusive() {
        let range = DateRange::new(d(2024, 1, 15), d(2024, 3, 10));
        assert!(range.contains(d(2024, 1, 15)));
        assert!(range.contains(d(2024, 3, 10)));
        assert!(!range.contains(d(2024, 3, 11)));
        assert!(!range.contains(d(2024, 1, 14)));
    }

    #[test]
    fn from_args_defaults_to_a_week() {
        let range = DateRange::from_args(None, None, d(2024, 3, 1)).unwrap();
        assert_eq!(range, DateRange::new(d(2024, 3, 1), d(2024, 3, 8)));
        assert!(DateRange::from_args(Some("2024-03-05"), Some("2024-03-01"), d(2024, 3, 1)).is_err());
        assert!(DateRange::from_args(Some("march"), None, d(2024, 3, 1)).is_err());
    }
}
