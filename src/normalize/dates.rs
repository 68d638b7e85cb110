//! Date parsing for upstream payloads.
//!
//! The prediction service sends ISO-8601 strings, sometimes as plain dates and
//! sometimes as full timestamps. We keep the calendar date *as written* and
//! drop any time-of-day or offset, so the result never depends on the local
//! timezone.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::ChartError;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an upstream date string to a calendar date.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, ChartError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ChartError::bad_date(raw, "empty string"));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        // `date_naive` on a fixed-offset datetime yields the date in that
        // offset, i.e. the one written in the string.
        return Ok(dt.date_naive());
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.date());
        }
    }

    Err(ChartError::bad_date(raw, "expected YYYY-MM-DD or an ISO-8601 timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn plain_date() {
        assert_eq!(normalize_date("2024-01-15").unwrap(), ymd(2024, 1, 15));
        assert_eq!(normalize_date("  2024-01-15 ").unwrap(), ymd(2024, 1, 15));
    }

    #[test]
    fn rfc3339_keeps_written_date() {
        // Late evening with a negative offset would be the next day in UTC.
        assert_eq!(normalize_date("2024-03-31T23:30:00-05:00").unwrap(), ymd(2024, 3, 31));
        assert_eq!(normalize_date("2024-04-01T00:15:00Z").unwrap(), ymd(2024, 4, 1));
    }

    #[test]
    fn naive_timestamp() {
        assert_eq!(normalize_date("2024-06-30T12:00:00").unwrap(), ymd(2024, 6, 30));
        assert_eq!(normalize_date("2024-06-30T12:00:00.123456").unwrap(), ymd(2024, 6, 30));
        assert_eq!(normalize_date("2024-06-30 08:00:00").unwrap(), ymd(2024, 6, 30));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        for raw in ["", "yesterday", "2024-13-01", "2024/01/15", "15-01-2024"] {
            let err = normalize_date(raw).unwrap_err();
            assert!(matches!(err, ChartError::Parse { .. }), "{raw}: {err:?}");
        }
    }
}
