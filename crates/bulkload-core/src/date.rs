// Dweve Bulkload - Streaming Bulk-Insertion Benchmark Engine
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Date normalization.
//!
//! Turns heterogeneous date text into a UTC instant. Accepted shapes:
//!
//! - **ISO-8601**: `2024-01-15`, `2024-01-15T10:30:00Z`, `2024-01-15 10:30:00`
//! - **US / European**: `01/15/2024`, `15/01/2024`, dash and dot variants
//! - **RFC 822 / 850 / 2822**: `Mon, 15 Jan 2024 10:30:00 GMT`, `Monday, 15-Jan-24 10:30:00 UTC`
//! - **Long month names**: `January 15, 2024`, `15 January 2024`, `Jan 15, 2024`
//! - **Year-month**: `2024-01`, `2024/01`
//! - **Unix epoch**: `1705314600` (seconds) or 13-digit milliseconds, 1970..2100 only
//! - a fallback list of further flexible patterns
//!
//! Ambiguous `MM/DD` vs `DD/MM` text is resolved by bounds-checking the month,
//! never by locale: the US reading wins when both readings are valid.
//!
//! Empty (or all-whitespace) input is *valid and absent*: `Ok(None)`.
//!
//! All functions are pure and safe to call from any number of threads.
//!
//! # Examples
//!
//! ```
//! use bulkload_core::date::normalize;
//!
//! assert_eq!(normalize("01/15/2024").unwrap().as_deref(), Some("2024-01-15T00:00:00Z"));
//! assert_eq!(normalize("15/01/2024").unwrap().as_deref(), Some("2024-01-15T00:00:00Z"));
//! assert_eq!(normalize("").unwrap(), None);
//! assert!(normalize("not a date").is_err());
//! ```

use crate::error::DateError;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc,
};

/// Smallest accepted epoch value (1970-01-01T00:00:00Z).
pub const EPOCH_MIN_SECS: i64 = 0;

/// Largest accepted epoch value (2100-01-01T00:00:00Z).
pub const EPOCH_MAX_SECS: i64 = 4_102_444_800;

/// The shape a date text was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateShape {
    /// RFC 3339 / ISO-8601 with offset.
    Rfc3339,
    /// ISO-8601 date and time without offset (taken as UTC).
    IsoDateTime,
    /// ISO-8601 date only.
    IsoDate,
    /// `MM/DD/YYYY`.
    UsSlash,
    /// `DD/MM/YYYY`.
    EuropeanSlash,
    /// `MM-DD-YYYY`.
    UsDash,
    /// `DD-MM-YYYY`.
    EuropeanDash,
    /// `DD.MM.YYYY`.
    EuropeanDot,
    /// RFC 2822 (superset of RFC 822 with four digit years).
    Rfc2822,
    /// RFC 822 / RFC 850 / RFC 1123 with a zone abbreviation.
    RfcLegacy,
    /// Month spelled out.
    LongMonth,
    /// `YYYY-MM`, day defaults to the first.
    YearMonth,
    /// Unix epoch seconds or milliseconds.
    UnixEpoch,
    /// One of the fallback patterns.
    Flexible,
}

/// A successfully normalized date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    /// The instant in UTC.
    pub instant: DateTime<Utc>,
    /// Which input shape matched.
    pub shape: DateShape,
}

impl NormalizedDate {
    /// RFC 3339 rendering of the instant, always with a `Z` suffix.
    pub fn to_rfc3339(&self) -> String {
        format_rfc3339(&self.instant)
    }
}

/// Formats a UTC instant as RFC 3339 (`2024-01-15T10:30:00Z`).
///
/// Fractional seconds are only printed when non-zero.
pub fn format_rfc3339(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Validates date text.
///
/// Returns `Ok(None)` for empty input, `Ok(Some(_))` for a recognized date and
/// `Err` for non-empty text that matches no accepted shape.
pub fn validate(text: &str) -> Result<Option<NormalizedDate>, DateError> {
    let s = text.trim();
    if s.is_empty() {
        return Ok(None);
    }

    let parsed = if s.bytes().all(|b| b.is_ascii_digit()) {
        parse_digits(s)?
    } else {
        parse_iso(s)
            .or_else(|| parse_rfc2822(s))
            .or_else(|| parse_numeric_triplet(s))
            .or_else(|| parse_legacy_rfc(s))
            .or_else(|| parse_long_month(s))
            .or_else(|| parse_year_month(s))
            .or_else(|| parse_flexible(s))
    };

    match parsed {
        Some(date) if (1..=9999).contains(&chrono::Datelike::year(&date.instant)) => Ok(Some(date)),
        _ => Err(DateError::Unrecognized(s.to_string())),
    }
}

/// Validates date text and renders it as RFC 3339.
pub fn normalize(text: &str) -> Result<Option<String>, DateError> {
    Ok(validate(text)?.map(|d| d.to_rfc3339()))
}

fn found(instant: DateTime<Utc>, shape: DateShape) -> Option<NormalizedDate> {
    Some(NormalizedDate { instant, shape })
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    utc(date.and_time(NaiveTime::MIN))
}

fn parse_digits(s: &str) -> Result<Option<NormalizedDate>, DateError> {
    // Compact forms first; epoch seconds of that width would fall in 1970..1973.
    match s.len() {
        8 => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d") {
                if (1900..=2100).contains(&chrono::Datelike::year(&d)) {
                    return Ok(found(midnight(d), DateShape::Flexible));
                }
            }
        }
        14 => {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S") {
                return Ok(found(utc(dt), DateShape::Flexible));
            }
        }
        _ => {}
    }

    let value: i64 = s
        .parse()
        .map_err(|_| DateError::Unrecognized(s.to_string()))?;
    let secs = if s.len() >= 13 { value / 1000 } else { value };
    if !(EPOCH_MIN_SECS..=EPOCH_MAX_SECS).contains(&secs) {
        return Err(DateError::EpochOutOfRange(value));
    }
    let instant = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or(DateError::EpochOutOfRange(value))?;
    Ok(found(instant, DateShape::UnixEpoch))
}

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_iso(s: &str) -> Option<NormalizedDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return found(dt.with_timezone(&Utc), DateShape::Rfc3339);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return found(dt.with_timezone(&Utc), DateShape::Rfc3339);
    }
    for fmt in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return found(utc(dt), DateShape::IsoDateTime);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| found(midnight(d), DateShape::IsoDate))
}

fn parse_rfc2822(s: &str) -> Option<NormalizedDate> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .and_then(|dt| found(dt.with_timezone(&Utc), DateShape::Rfc2822))
}

/// `a{sep}b{sep}c` with an optional time suffix.
fn parse_numeric_triplet(s: &str) -> Option<NormalizedDate> {
    let (date_part, time_part) = match s.split_once(' ') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };
    let sep = ['/', '-', '.']
        .into_iter()
        .find(|c| date_part.contains(*c))?;
    let mut parts = date_part.split(sep);
    let (a, b, c) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    if ![a, b, c]
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let time = match time_part {
        Some(t) => parse_time(t)?,
        None => NaiveTime::MIN,
    };

    let (date, shape) = if a.len() == 4 {
        // YYYY/MM/DD and YYYY.MM.DD; dashed ISO was handled earlier.
        let date = ymd(a, b, c)?;
        (date, DateShape::Flexible)
    } else if c.len() == 4 {
        let (first, second): (u32, u32) = (a.parse().ok()?, b.parse().ok()?);
        let year: i32 = c.parse().ok()?;
        let us = || {
            (1..=12)
                .contains(&first)
                .then(|| NaiveDate::from_ymd_opt(year, first, second))
                .flatten()
        };
        let eu = || {
            (1..=12)
                .contains(&second)
                .then(|| NaiveDate::from_ymd_opt(year, second, first))
                .flatten()
        };
        match sep {
            '/' => us()
                .map(|d| (d, DateShape::UsSlash))
                .or_else(|| eu().map(|d| (d, DateShape::EuropeanSlash)))?,
            '-' => us()
                .map(|d| (d, DateShape::UsDash))
                .or_else(|| eu().map(|d| (d, DateShape::EuropeanDash)))?,
            _ => eu()
                .map(|d| (d, DateShape::EuropeanDot))
                .or_else(|| us().map(|d| (d, DateShape::Flexible)))?,
        }
    } else {
        return None;
    };

    found(utc(date.and_time(time)), shape)
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    let month: u32 = m.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, month, d.parse().ok()?)
}

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

fn parse_time(t: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(t, fmt).ok())
}

/// Offset in seconds for the zone designators RFC 822 allows.
fn zone_offset(zone: &str) -> Option<i32> {
    let hours = match zone.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "UT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        other => {
            let (sign, digits) = match other.as_bytes().first()? {
                b'+' => (1, &other[1..]),
                b'-' => (-1, &other[1..]),
                _ => return None,
            };
            let digits = digits.replace(':', "");
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let h: i32 = digits[..2].parse().ok()?;
            let m: i32 = digits[2..].parse().ok()?;
            return Some(sign * (h * 3600 + m * 60));
        }
    };
    Some(hours * 3600)
}

const LEGACY_RFC_FORMATS: &[&str] = &[
    // RFC 850
    "%A, %d-%b-%y %H:%M:%S",
    // RFC 1123
    "%a, %d %b %Y %H:%M:%S",
    // RFC 822
    "%d %b %y %H:%M",
    "%d %b %y %H:%M:%S",
    "%a, %d %b %y %H:%M:%S",
];

fn parse_legacy_rfc(s: &str) -> Option<NormalizedDate> {
    let (body, zone) = s.rsplit_once(' ')?;
    let offset = FixedOffset::east_opt(zone_offset(zone)?)?;
    LEGACY_RFC_FORMATS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(body, fmt).ok()?;
        let local = offset.from_local_datetime(&naive).single()?;
        found(local.with_timezone(&Utc), DateShape::RfcLegacy)
    })
}

const LONG_MONTH_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%A, %B %d, %Y",
    "%a, %B %d, %Y",
    "%d-%b-%Y",
];

fn parse_long_month(s: &str) -> Option<NormalizedDate> {
    if !s.bytes().any(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    if let Some(d) = LONG_MONTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return found(midnight(d), DateShape::LongMonth);
    }
    // "January 2024" has no day; pin it to the first.
    let with_day = format!("1 {}", s.replace(',', ""));
    NaiveDate::parse_from_str(&with_day, "%d %B %Y")
        .ok()
        .and_then(|d| found(midnight(d), DateShape::LongMonth))
}

fn parse_year_month(s: &str) -> Option<NormalizedDate> {
    let (y, m) = s.split_once('-').or_else(|| s.split_once('/'))?;
    if y.len() != 4 || m.is_empty() || m.len() > 2 {
        return None;
    }
    if !y.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date = ymd(y, m, "1")?;
    found(midnight(date), DateShape::YearMonth)
}

const FLEXIBLE_DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M%SZ",
    "%d %b %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%b %d, %Y %I:%M %p",
    "%a %b %e %H:%M:%S %Y",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
];

const FLEXIBLE_DATE_FORMATS: &[&str] = &["%Y.%m.%d", "%Y/%m/%d", "%b %d %Y", "%d.%b.%Y", "%Y %B %d"];

fn parse_flexible(s: &str) -> Option<NormalizedDate> {
    if let Some(dt) = FLEXIBLE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return found(utc(dt), DateShape::Flexible);
    }
    FLEXIBLE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| found(midnight(d), DateShape::Flexible))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        normalize(s)
            .unwrap_or_else(|e| panic!("{s:?} should normalize: {e}"))
            .unwrap_or_else(|| panic!("{s:?} should not be absent"))
    }

    fn shape(s: &str) -> DateShape {
        validate(s).unwrap().unwrap().shape
    }

    #[test]
    fn test_empty_is_valid_and_absent() {
        assert_eq!(validate("").unwrap(), None);
        assert_eq!(validate("   ").unwrap(), None);
    }

    #[test]
    fn test_iso_shapes() {
        assert_eq!(norm("2024-01-15"), "2024-01-15T00:00:00Z");
        assert_eq!(norm("2024-01-15T10:30:00Z"), "2024-01-15T10:30:00Z");
        assert_eq!(norm("2024-01-15T10:30:00+02:00"), "2024-01-15T08:30:00Z");
        assert_eq!(norm("2024-01-15 10:30:00"), "2024-01-15T10:30:00Z");
        assert_eq!(norm("2024-01-15T10:30"), "2024-01-15T10:30:00Z");
        assert_eq!(shape("2024-01-15"), DateShape::IsoDate);
        assert_eq!(shape("2024-01-15 10:30:00"), DateShape::IsoDateTime);
    }

    #[test]
    fn test_us_versus_european() {
        assert_eq!(norm("01/15/2024"), "2024-01-15T00:00:00Z");
        assert_eq!(shape("01/15/2024"), DateShape::UsSlash);
        assert_eq!(norm("15/01/2024"), "2024-01-15T00:00:00Z");
        assert_eq!(shape("15/01/2024"), DateShape::EuropeanSlash);
        // Both readings valid: US wins.
        assert_eq!(norm("03/04/2024"), "2024-03-04T00:00:00Z");
        assert_eq!(norm("12-25-2023"), "2023-12-25T00:00:00Z");
        assert_eq!(norm("25-12-2023"), "2023-12-25T00:00:00Z");
        assert_eq!(norm("25.12.2023"), "2023-12-25T00:00:00Z");
        assert_eq!(shape("25.12.2023"), DateShape::EuropeanDot);
    }

    #[test]
    fn test_month_out_of_range_rejected() {
        assert!(validate("13/13/2024").is_err());
        assert!(validate("2024-13-01").is_err());
        assert!(validate("2024-13").is_err());
    }

    #[test]
    fn test_triplet_with_time() {
        assert_eq!(norm("01/15/2024 13:45:10"), "2024-01-15T13:45:10Z");
        assert_eq!(norm("01/15/2024 01:45 PM"), "2024-01-15T13:45:00Z");
    }

    #[test]
    fn test_rfc_shapes() {
        assert_eq!(norm("Mon, 15 Jan 2024 10:30:00 GMT"), "2024-01-15T10:30:00Z");
        assert_eq!(norm("Mon, 15 Jan 2024 10:30:00 -0500"), "2024-01-15T15:30:00Z");
        assert_eq!(norm("Monday, 15-Jan-24 10:30:00 UTC"), "2024-01-15T10:30:00Z");
        assert_eq!(norm("15 Jan 24 10:30 MST"), "2024-01-15T17:30:00Z");
    }

    #[test]
    fn test_long_month_names() {
        assert_eq!(norm("January 15, 2024"), "2024-01-15T00:00:00Z");
        assert_eq!(norm("15 January 2024"), "2024-01-15T00:00:00Z");
        assert_eq!(norm("Jan 15, 2024"), "2024-01-15T00:00:00Z");
        assert_eq!(norm("15-Jan-2024"), "2024-01-15T00:00:00Z");
        assert_eq!(norm("March 2023"), "2023-03-01T00:00:00Z");
    }

    #[test]
    fn test_year_month() {
        assert_eq!(norm("2024-02"), "2024-02-01T00:00:00Z");
        assert_eq!(norm("2024/11"), "2024-11-01T00:00:00Z");
        assert_eq!(shape("2024-02"), DateShape::YearMonth);
    }

    #[test]
    fn test_epoch_bounds() {
        assert_eq!(norm("0"), "1970-01-01T00:00:00Z");
        assert_eq!(norm("1705314600"), "2024-01-15T10:30:00Z");
        assert_eq!(norm("1705314600000"), "2024-01-15T10:30:00Z");
        assert_eq!(
            validate("4102444801"),
            Err(DateError::EpochOutOfRange(4_102_444_801))
        );
    }

    #[test]
    fn test_compact_digits() {
        assert_eq!(norm("20240115"), "2024-01-15T00:00:00Z");
        assert_eq!(norm("20240115103000"), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_garbage_rejected() {
        for bad in ["not a date", "2024-01-32", "31/31/2024", "yesterday", "12:30", "1/2"] {
            assert!(validate(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_fractional_seconds_preserved() {
        assert_eq!(norm("2024-01-15T10:30:00.250Z"), "2024-01-15T10:30:00.250Z");
    }
}
