//! Date literal detection and parsing.
//!
//! Strings that look like dates are compared chronologically rather than
//! lexically. Detection is deliberately permissive; parsing may still fail for
//! a detected string, in which case callers treat the value as incomparable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

// Only the first alternative is anchored at the start and only the last at the
// end. Detection relies on exactly this shape.
static DATE_TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?)|",
        r"(\d{2} \w{3} \d{4} \d{2}:\d{2}:\d{2} [A-Z]{3})|",
        r"(\w{3} \d{1,2},? \d{4} \d{2}:\d{2}(:\d{2})? [AP]M)|",
        r"(\d{4}-\d{2}-\d{2})$",
    ))
    .expect("date pattern is valid")
});

/// Human-readable layouts tried after the ISO family
const HUMAN_LAYOUTS: &[&str] = &[
    "%d %b %Y %H:%M:%S",
    "%b %d, %Y %I:%M:%S %p",
    "%b %d, %Y %I:%M %p",
    "%b %d %Y %I:%M:%S %p",
    "%b %d %Y %I:%M %p",
];

/// Check whether `s` looks like a date or date-time literal
pub fn is_date_time(s: &str) -> bool {
    DATE_TIME_PATTERN.is_match(s)
}

/// Parse a date or date-time string into a UTC timestamp
///
/// Supports RFC 3339, `YYYYMMDD`, `YYYY-MM-DD` with optional `HH`, `HH:MM` or
/// `HH:MM:SS` (separated by a space or `T`), the same with `/` separators, and
/// the human formats recognised by [`is_date_time`]. Values without an offset
/// are taken as UTC.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }

    let normalized = s.replace('/', "-").replacen('T', " ", 1);
    let by_length = match normalized.len() {
        8 => NaiveDate::parse_from_str(&normalized, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        10 => NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        13 => NaiveDateTime::parse_from_str(&format!("{}:00", normalized), "%Y-%m-%d %H:%M").ok(),
        16 => NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M").ok(),
        19 => NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S").ok(),
        _ => NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f").ok(),
    };
    if let Some(naive) = by_length {
        return Some(naive.and_utc());
    }

    parse_human(s).map(|naive| naive.and_utc())
}

fn parse_human(s: &str) -> Option<NaiveDateTime> {
    // "02 Jan 2006 15:04:05 MST": the zone abbreviation is dropped.
    let without_zone = match s.rsplit_once(' ') {
        Some((head, zone)) if zone.len() == 3 && zone.chars().all(|c| c.is_ascii_uppercase()) => {
            head
        }
        _ => s,
    };
    HUMAN_LAYOUTS.iter().find_map(|layout| {
        NaiveDateTime::parse_from_str(without_zone, layout)
            .or_else(|_| NaiveDateTime::parse_from_str(s, layout))
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_detects_iso_and_plain_dates() {
        assert!(is_date_time("2023-01-01"));
        assert!(is_date_time("2023-01-01T10:20:30Z"));
        assert!(is_date_time("2023-01-01 10:20:30.123+02:00"));
        assert!(is_date_time("02 Jan 2006 15:04:05 UTC"));
        assert!(is_date_time("Jan 2, 2006 03:04 PM"));
    }

    #[test]
    fn test_rejects_plain_text_and_numbers() {
        assert!(!is_date_time("hello"));
        assert!(!is_date_time("20230101"));
        assert!(!is_date_time("100"));
        assert!(!is_date_time("2023-1-1"));
    }

    #[test]
    fn test_parse_layouts() {
        let t = parse_time("2023-04-05").unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2023, 4, 5));

        let t = parse_time("2023/04/05 10:11").unwrap();
        assert_eq!((t.hour(), t.minute()), (10, 11));

        let t = parse_time("2023-04-05T10:11:12").unwrap();
        assert_eq!(t.second(), 12);

        let t = parse_time("2023-04-05T10:11:12+02:00").unwrap();
        assert_eq!(t.hour(), 8);

        let t = parse_time("20230405").unwrap();
        assert_eq!(t.day(), 5);

        let t = parse_time("2023-04-05 10").unwrap();
        assert_eq!(t.hour(), 10);
    }

    #[test]
    fn test_parse_human_layouts() {
        let t = parse_time("02 Jan 2006 15:04:05 MST").unwrap();
        assert_eq!((t.year(), t.month(), t.hour()), (2006, 1, 15));

        let t = parse_time("Jan 2, 2006 03:04 PM").unwrap();
        assert_eq!((t.day(), t.hour()), (2, 15));
    }

    #[test]
    fn test_parse_failure() {
        assert!(parse_time("not a date").is_none());
        assert!(parse_time("2023-13-45").is_none());
    }
}
