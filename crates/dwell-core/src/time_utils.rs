use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::error::{DwellError, Result};

/// Accepted layouts for the combined `"<date> <time>"` string.
///
/// `%.f` also matches an absent fractional part, so whole-second times parse
/// through the first two entries as well.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Combine a log row's `date` and `time` columns into one timestamp.
///
/// Sub-second precision is preserved. Leading/trailing whitespace on either
/// part is ignored.
pub fn parse_log_timestamp(date: &str, time: &str) -> Result<NaiveDateTime> {
    let combined = format!("{} {}", date.trim(), time.trim());
    parse_timestamp(&combined)
}

/// Parse a single date-time string in any of the supported layouts.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DwellError::TimestampParse(String::new()));
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| DwellError::TimestampParse(s.to_string()))
}

/// Parse a calendar date such as `2024-03-01`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| DwellError::TimestampParse(s.to_string()))
}

/// Truncate a timestamp to the start of its minute.
pub fn floor_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Render a timestamp with millisecond precision, e.g.
/// `2024-03-01 10:00:00.250`.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_timestamp_with_fraction() {
        let ts = parse_log_timestamp("2024-03-01", "10:00:00.123456").unwrap();
        assert_eq!(ts.nanosecond(), 123_456_000);
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn test_parse_log_timestamp_without_fraction() {
        let ts = parse_log_timestamp("2024-03-01", "10:00:30").unwrap();
        assert_eq!(ts.second(), 30);
        assert_eq!(ts.nanosecond(), 0);
    }

    #[test]
    fn test_parse_log_timestamp_trims_whitespace() {
        let ts = parse_log_timestamp(" 2024-03-01 ", " 23:59:59.5 ").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(ts.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_parse_timestamp_iso_t_separator() {
        assert!(parse_timestamp("2024-03-01T10:00:00").is_ok());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_log_timestamp("yesterday", "noon").unwrap_err();
        assert!(matches!(err, DwellError::TimestampParse(ref s) if s == "yesterday noon"));
        assert!(parse_timestamp("   ").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date("2024-03-01").unwrap(), expected);
        assert_eq!(parse_date("2024/03/01").unwrap(), expected);
        assert_eq!(parse_date("01.03.2024").unwrap(), expected);
        assert!(parse_date("March 1st").is_err());
    }

    #[test]
    fn test_floor_to_minute() {
        let ts = parse_timestamp("2024-03-01 10:07:42.9").unwrap();
        assert_eq!(
            floor_to_minute(ts),
            parse_timestamp("2024-03-01 10:07:00").unwrap()
        );
    }

    #[test]
    fn test_format_timestamp_millis() {
        let ts = parse_timestamp("2024-03-01 10:00:00.25").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01 10:00:00.250");
    }
}
