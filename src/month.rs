use chrono::{Datelike, Month as CalendarMonth, NaiveDate};
use regex::Regex;
use serde_with::DeserializeFromStr;
use thiserror::Error;

use std::{
    fmt::{Debug, Display},
    str::FromStr,
    sync::LazyLock,
};

static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}) ([A-Za-z]+)$").expect("valid month regex"));

/// Represents a calendar month, such as January 2022.
///
/// The month is stored internally as the date of its first day. Its textual
/// form, used both in the sales data and when asking the user for a month,
/// is a four-digit year followed by the full English month name:
///
/// ```
/// # use milk_sales::Month;
/// let month: Month = "2022 January".parse().unwrap();
/// assert_eq!(month.year(), 2022);
/// assert_eq!(month.month(), 1);
/// assert_eq!(month.to_string(), "2022 January");
/// ```
#[derive(Clone, Copy, DeserializeFromStr, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Month(NaiveDate);

/// The error returned when a string is not a `YYYY Month` value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid month {0:?}: expected 'YYYY Month' (e.g. '2022 January')")]
pub struct ParseMonthError(String);

impl Month {
    /// Creates the month `month` (1 to 12) of `year`.
    ///
    /// Returns `None` if `month` is out of range.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// The month number, from 1 (January) to 12 (December).
    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    /// The full English name of the month, e.g. `January`.
    #[must_use]
    pub fn name(self) -> &'static str {
        CalendarMonth::try_from(self.month() as u8)
            .map(|m| m.name())
            .unwrap_or_default()
    }

    /// Counts months from January of year 0, so that consecutive months
    /// have consecutive ordinals. Charts use this as their time axis.
    #[must_use]
    pub fn ordinal(self) -> i32 {
        self.year() * 12 + self.month() as i32 - 1
    }

    /// The inverse of [`Month::ordinal`].
    #[must_use]
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        Self::new(ordinal.div_euclid(12), ordinal.rem_euclid(12) as u32 + 1)
    }
}

impl Debug for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04} {}", self.year(), self.name())
    }
}

impl FromStr for Month {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ParseMonthError(s.to_string());
        let caps = MONTH_RE.captures(s).ok_or_else(invalid)?;
        let year: i32 = caps[1].parse().map_err(|_| invalid())?;
        let month = (1..=12u8)
            .filter_map(|n| CalendarMonth::try_from(n).ok())
            .find(|m| m.name().eq_ignore_ascii_case(&caps[2]))
            .ok_or_else(invalid)?;
        Self::new(year, month.number_from_month()).ok_or_else(invalid)
    }
}
