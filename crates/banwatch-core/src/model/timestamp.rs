// # Timestamps
//
// The upstream API uses two timestamp dialects:
//
// - Ban list entries: `2024.01.02-10.00.00` (`BAN_TIME_FORMAT`)
// - Player actions and comments: `2024-01-02T10:00:00.000` (`API_TIME_FORMAT`)
//
// The watermark file uses the ban list dialect so a persisted value compares
// directly with `ban_time`.

use chrono::{DateTime, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Format of `ban_time` in the ban list and of the persisted watermark
pub const BAN_TIME_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";

/// Format of action and comment timestamps (fractional seconds optional)
pub const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Format used when showing timestamps in notifications
pub const DISPLAY_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Parse a `ban_time` value (`YYYY.MM.DD-HH.MM.SS`)
pub fn parse_ban_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, BAN_TIME_FORMAT)
        .map_err(|e| Error::timestamp(value, e.to_string()))
}

/// Parse an action or comment timestamp
///
/// Accepts the naive ISO form the API emits and, as a fallback, RFC 3339
/// with an explicit offset (normalized to UTC).
pub fn parse_api_time(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    NaiveDateTime::parse_from_str(trimmed, API_TIME_FORMAT)
        .or_else(|naive_err| {
            DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.naive_utc())
                .map_err(|_| naive_err)
        })
        .map_err(|e| Error::timestamp(value, e.to_string()))
}

/// Format a timestamp for display in a notification
pub fn display(time: &NaiveDateTime) -> String {
    time.format(DISPLAY_TIME_FORMAT).to_string()
}

/// The "last checked" boundary
///
/// Bans with a `ban_time` strictly greater than the watermark are new.
/// [`Watermark::MIN`] is the floor used when nothing has been persisted yet,
/// so every ban counts as new on a first run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(NaiveDateTime);

impl Watermark {
    /// Minimum representable watermark
    pub const MIN: Watermark = Watermark(NaiveDateTime::MIN);

    /// Wrap a timestamp
    pub fn new(time: NaiveDateTime) -> Self {
        Self(time)
    }

    /// Parse a persisted watermark (`YYYY.MM.DD-HH.MM.SS`)
    ///
    /// Surrounding whitespace is tolerated here, unlike in `ban_time` values.
    pub fn parse(value: &str) -> Result<Self> {
        parse_ban_time(value.trim()).map(Self)
    }

    /// The underlying timestamp
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Whether this is the initial floor value
    pub fn is_min(&self) -> bool {
        *self == Self::MIN
    }

    /// Whether a ban issued at `ban_time` lies beyond this watermark
    pub fn is_before(&self, ban_time: &NaiveDateTime) -> bool {
        self.0 < *ban_time
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<NaiveDateTime> for Watermark {
    fn from(time: NaiveDateTime) -> Self {
        Self(time)
    }
}

impl FromStr for Watermark {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BAN_TIME_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_ban_time() {
        assert_eq!(
            parse_ban_time("2024.01.02-10.00.00").unwrap(),
            at(2024, 1, 2, 10, 0, 0)
        );
        assert!(parse_ban_time("2024-01-02 10:00:00").is_err());
        assert!(parse_ban_time("").is_err());
        assert!(parse_ban_time(" 2024.01.02-10.00.00").is_err());
        assert!(parse_ban_time("2024.01.02-10.00.00 ").is_err());
    }

    #[test]
    fn test_parse_api_time_with_and_without_fraction() {
        assert_eq!(
            parse_api_time("2024-01-02T10:00:00.000").unwrap(),
            at(2024, 1, 2, 10, 0, 0)
        );
        assert_eq!(
            parse_api_time("2024-01-02T10:00:00.123456").unwrap(),
            at(2024, 1, 2, 10, 0, 0) + chrono::Duration::microseconds(123_456)
        );
        assert_eq!(
            parse_api_time("2024-01-02T10:00:00").unwrap(),
            at(2024, 1, 2, 10, 0, 0)
        );
    }

    #[test]
    fn test_parse_api_time_rfc3339_fallback() {
        assert_eq!(
            parse_api_time("2024-01-02T12:00:00+02:00").unwrap(),
            at(2024, 1, 2, 10, 0, 0)
        );
        assert!(parse_api_time("yesterday").is_err());
    }

    #[test]
    fn test_display_format() {
        assert_eq!(display(&at(2024, 1, 2, 10, 5, 9)), "02.01.2024 10:05:09");
    }

    #[test]
    fn test_watermark_roundtrip_and_ordering() {
        let wm = Watermark::parse(" 2024.01.02-10.00.00\n").unwrap();
        assert_eq!(wm.to_string(), "2024.01.02-10.00.00");
        assert!(Watermark::MIN < wm);
        assert!(Watermark::default().is_min());
        assert!(wm.is_before(&at(2024, 1, 2, 10, 0, 1)));
        assert!(!wm.is_before(&at(2024, 1, 2, 10, 0, 0)));
    }
}
