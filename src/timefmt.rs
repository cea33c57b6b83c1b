use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::model::Ms;

/// Offset-carrying layouts, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// Naive layouts, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub fn now_ms() -> Ms {
    Utc::now().timestamp_millis()
}

/// Parse a client timestamp into UTC milliseconds.
///
/// Accepts RFC 3339, Postgres-style `YYYY-MM-DD HH:MM:SS+hh`, naive
/// date-times (taken as UTC), bare dates (midnight UTC) and integer
/// Unix milliseconds.
pub fn parse_timestamp(input: &str) -> Result<Ms, TimestampError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(TimestampError(input.to_string()));
    }
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.timestamp_millis());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc().timestamp_millis());
    }
    Err(TimestampError(input.to_string()))
}

/// Render as RFC 3339 UTC, e.g. `2031-01-01T14:00:00Z`.
pub fn format_timestamp(ms: Ms) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        None => ms.to_string(),
    }
}

#[derive(Debug, PartialEq)]
pub struct TimestampError(pub String);

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized timestamp: {:?}", self.0)
    }
}

impl std::error::Error for TimestampError {}

#[cfg(test)]
mod tests {
    use super::*;

    // 2031-01-01T14:00:00Z
    const JAN1_14: Ms = 1_925_042_400_000;

    #[test]
    fn rfc3339_forms() {
        assert_eq!(parse_timestamp("2031-01-01T14:00:00Z").unwrap(), JAN1_14);
        assert_eq!(parse_timestamp("2031-01-01T16:00:00+02:00").unwrap(), JAN1_14);
        assert_eq!(parse_timestamp("2031-01-01T14:00:00.000Z").unwrap(), JAN1_14);
    }

    #[test]
    fn postgres_style_offsets() {
        assert_eq!(parse_timestamp("2031-01-01 14:00:00+00").unwrap(), JAN1_14);
        assert_eq!(parse_timestamp("2031-01-01 15:00:00+01:00").unwrap(), JAN1_14);
    }

    #[test]
    fn naive_forms_are_utc() {
        assert_eq!(parse_timestamp("2031-01-01T14:00").unwrap(), JAN1_14);
        assert_eq!(parse_timestamp("2031-01-01T14:00:00").unwrap(), JAN1_14);
        assert_eq!(parse_timestamp("2031-01-01 14:00:00").unwrap(), JAN1_14);
        assert_eq!(parse_timestamp("2031-01-01 14:00").unwrap(), JAN1_14);
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(
            parse_timestamp("2031-01-01").unwrap(),
            JAN1_14 - 14 * 3_600_000
        );
    }

    #[test]
    fn integer_millis_pass_through() {
        assert_eq!(parse_timestamp("1925042400000").unwrap(), JAN1_14);
        assert_eq!(parse_timestamp(" 42 ").unwrap(), 42);
    }

    #[test]
    fn garbage_rejected() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("tomorrow").is_err());
        assert!(parse_timestamp("2031-13-01T00:00").is_err());
    }

    #[test]
    fn format_is_rfc3339_utc() {
        assert_eq!(format_timestamp(JAN1_14), "2031-01-01T14:00:00Z");
        assert_eq!(parse_timestamp(&format_timestamp(JAN1_14 + 1)).unwrap(), JAN1_14 + 1);
    }
}
