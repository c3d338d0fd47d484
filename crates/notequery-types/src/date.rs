//! Date specifications for journal-range predicates.
//!
//! A date is either an offset relative to "now" in some unit, or an
//! absolute epoch-millisecond timestamp.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Unit of a relative date offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "m")]
    Minute,
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "M")]
    Month,
    #[serde(rename = "y")]
    Year,
}

impl TimeUnit {
    /// Single-letter unit symbol used on the wire. Case matters: `m` is
    /// minutes, `M` is months.
    pub fn symbol(&self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Minute => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Week => "w",
            TimeUnit::Month => "M",
            TimeUnit::Year => "y",
        }
    }

    /// Parse a unit symbol.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            's' => Some(TimeUnit::Second),
            'm' => Some(TimeUnit::Minute),
            'h' => Some(TimeUnit::Hour),
            'd' => Some(TimeUnit::Day),
            'w' => Some(TimeUnit::Week),
            'M' => Some(TimeUnit::Month),
            'y' => Some(TimeUnit::Year),
            _ => None,
        }
    }
}

/// A point in time for a journal date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DateSpec {
    /// Signed offset from now, e.g. `-7` days
    Relative { value: i64, unit: TimeUnit },

    /// Epoch-millisecond timestamp
    Absolute { value: i64 },
}

impl DateSpec {
    /// Offset from now.
    pub fn relative(value: i64, unit: TimeUnit) -> Self {
        DateSpec::Relative { value, unit }
    }

    /// Fixed timestamp in epoch milliseconds.
    pub fn absolute(value: i64) -> Self {
        DateSpec::Absolute { value }
    }

    /// Fixed timestamp from a chrono datetime.
    pub fn at(datetime: DateTime<Utc>) -> Self {
        DateSpec::Absolute {
            value: datetime.timestamp_millis(),
        }
    }

    /// Today, as a zero-day relative offset.
    pub fn today() -> Self {
        DateSpec::relative(0, TimeUnit::Day)
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSpec::Relative { value, unit } => write!(f, "{:+}{}", value, unit.symbol()),
            DateSpec::Absolute { value } => write!(f, "{}", value),
        }
    }
}

/// Accepted forms:
/// - relative: `-7d`, `+2M`, `0d`, `3w`, plus `today` and `yesterday`
/// - absolute: epoch milliseconds, RFC 3339, or `YYYY-MM-DD` (midnight UTC)
impl FromStr for DateSpec {
    type Err = QueryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();

        match s.to_ascii_lowercase().as_str() {
            "today" => return Ok(DateSpec::today()),
            "yesterday" => return Ok(DateSpec::relative(-1, TimeUnit::Day)),
            _ => {}
        }

        if let Some(unit_char) = s.chars().last() {
            if let Some(unit) = TimeUnit::from_symbol(unit_char) {
                let number = &s[..s.len() - unit_char.len_utf8()];
                if let Ok(value) = number.parse::<i64>() {
                    return Ok(DateSpec::relative(value, unit));
                }
            }
        }

        if let Ok(value) = s.parse::<i64>() {
            return Ok(DateSpec::absolute(value));
        }

        if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
            return Ok(DateSpec::absolute(datetime.timestamp_millis()));
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(DateSpec::absolute(midnight.and_utc().timestamp_millis()));
            }
        }

        Err(QueryError::InvalidQuery(format!(
            "cannot interpret '{}' as a date",
            input
        )))
    }
}
