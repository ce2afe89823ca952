//! Calendar granularities used by the nights-stayed statistics.
//!
//! INSEE publishes periods as `"YYYY"` for annual aggregates and `"YYYY-MM"` for
//! monthly ones. [`TimePeriod`] parses both forms and displays them back unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Year(pub i32);
impl Year {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A calendar month of a given year. Ordering is chronological.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Month(pub i32, pub u32);
impl Month {
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }
    /// Returns `None` when `month` is outside `1..=12`.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(year, month))
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// Either a whole year or a single month, as found in the `time_period` column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Year(Year),
    Month(Month),
}

impl TimePeriod {
    pub fn year(self) -> Year {
        match self {
            TimePeriod::Year(year) => year,
            TimePeriod::Month(month) => Year(month.year()),
        }
    }

    pub fn as_month(self) -> Option<Month> {
        match self {
            TimePeriod::Month(month) => Some(month),
            TimePeriod::Year(_) => None,
        }
    }
}

impl Display for TimePeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TimePeriod::Year(year) => year.fmt(f),
            TimePeriod::Month(month) => month.fmt(f),
        }
    }
}

/// Error returned when a period string is neither `YYYY` nor `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid time period '{0}', expected YYYY or YYYY-MM")]
pub struct ParsePeriodError(pub String);

impl FromStr for TimePeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParsePeriodError(s.to_string());
        let parse_year = |y: &str| -> Result<i32, ParsePeriodError> {
            if y.len() != 4 || !y.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            y.parse::<i32>().map_err(|_| err())
        };

        match trimmed.split_once('-') {
            None => Ok(TimePeriod::Year(Year(parse_year(trimmed)?))),
            Some((y, m)) => {
                if m.len() != 2 {
                    return Err(err());
                }
                let month = m.parse::<u32>().map_err(|_| err())?;
                Month::new(month, parse_year(y)?)
                    .map(TimePeriod::Month)
                    .ok_or_else(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_annual_and_monthly_periods() {
        assert_eq!("2024".parse(), Ok(TimePeriod::Year(Year(2024))));
        assert_eq!("2024-07".parse(), Ok(TimePeriod::Month(Month(2024, 7))));
    }

    #[test]
    fn rejects_malformed_periods() {
        for bad in ["24", "2024-13", "2024-00", "2024-7", "abcd", "2024-07-01", ""] {
            assert!(bad.parse::<TimePeriod>().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn display_round_trips_source_format() {
        assert_eq!(TimePeriod::Month(Month(2024, 3)).to_string(), "2024-03");
        assert_eq!(TimePeriod::Year(Year(2024)).to_string(), "2024");
    }

    #[test]
    fn months_order_chronologically() {
        assert!(Month(2023, 12) < Month(2024, 1));
        assert_eq!(TimePeriod::Month(Month(2024, 5)).year(), Year(2024));
    }
}
