//! Calendar dates and stay ranges.
//!
//! Dates travel as ISO-8601 calendar dates (`YYYY-MM-DD`). Some clients send
//! `dd.mm.yy` or `dd.mm.yyyy` instead; those are accepted and normalized so a
//! request is never rejected only because of its date notation.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

/// ISO calendar date format used on the wire.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors produced while parsing dates or building ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// The text is not a date in any accepted notation.
    #[error("Unrecognized date: '{0}'")]
    Unrecognized(String),

    /// The start of a range is not strictly before its end.
    #[error("Invalid date range: start {start} must be before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Parses a date in ISO notation, falling back to `dd.mm.yy` / `dd.mm.yyyy`.
///
/// Two-digit years are taken as `20yy`.
pub fn parse_wire_date(raw: &str) -> Result<NaiveDate, DateError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT) {
        return Ok(date);
    }
    parse_dotted(raw).ok_or_else(|| DateError::Unrecognized(raw.to_string()))
}

fn parse_dotted(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('.').collect();
    let [day, month, year] = parts[..] else {
        return None;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if day.len() != 2 || month.len() != 2 || !digits(day) || !digits(month) || !digits(year) {
        return None;
    }

    let year: i32 = match year.len() {
        2 => 2000 + year.parse::<i32>().ok()?,
        4 => year.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Formats a date in ISO notation.
pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// A stay between two calendar dates, `start` strictly before `end`.
///
/// Overlap is inclusive on both ends: a stay ending on day D and one starting
/// on day D are considered to collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateError> {
        if start >= end {
            return Err(DateError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if the two ranges share at least one day, boundaries included.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.end >= other.start && self.start <= other.end
    }

    /// Returns true if `day` falls inside the range, boundaries included.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", format_iso(self.start), format_iso(self.end))
    }
}

/// Serde adapter for `NaiveDate` fields: writes ISO, reads any accepted notation.
pub mod wire_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(ISO_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_wire_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional `NaiveDate` fields. Use with `#[serde(default)]`.
pub mod option_wire_date {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.collect_str(&date.format(ISO_DATE_FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse_wire_date(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
