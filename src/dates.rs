/// Calendar-day strings (`YYYYMMDD`) used as cache and request keys
use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use regex::Regex;

static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}$").expect("static day pattern compiles"));

/// Format a date as an 8-digit calendar-day string, e.g. `20240115`
pub fn format_day(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

/// The calendar-day string for a local timestamp
pub fn day_of(now: NaiveDateTime) -> String {
    format_day(now.date())
}

/// Parse an 8-digit calendar-day string into a real date.
///
/// Only years 1900..=2100 are accepted, and the month/day pair has to exist
/// on the calendar (no Feb 30, no Apr 31, no Feb 29 outside leap years).
pub fn parse_day(day: &str) -> Option<NaiveDate> {
    if !DAY_PATTERN.is_match(day) {
        return None;
    }

    let year: i32 = day[0..4].parse().ok()?;
    let month: u32 = day[4..6].parse().ok()?;
    let dom: u32 = day[6..8].parse().ok()?;

    if !(1900..=2100).contains(&year) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, dom)
}

pub fn is_valid_day(day: &str) -> bool {
    parse_day(day).is_some()
}

/// Two day strings name the same day. Invalid strings never match.
pub fn same_day(a: &str, b: &str) -> bool {
    is_valid_day(a) && is_valid_day(b) && a == b
}

/// The day `n` days before `day`
pub fn days_before(day: NaiveDate, n: u64) -> Option<NaiveDate> {
    day.checked_sub_days(Days::new(n))
}

/// The day string for the day before `day`, if `day` is valid
pub fn previous_day(day: &str) -> Option<String> {
    parse_day(day)
        .and_then(|date| days_before(date, 1))
        .map(format_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_day() {
        assert_eq!(format_day(date(2024, 1, 15)), "20240115");
        assert_eq!(format_day(date(2024, 12, 31)), "20241231");
    }

    #[test]
    fn test_day_of_ignores_time() {
        let now = date(2024, 12, 31).and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(day_of(now), "20241231");
    }

    #[test]
    fn test_valid_days() {
        assert!(is_valid_day("20240115"));
        assert!(is_valid_day("20241231"));
        assert!(is_valid_day("20240229"));
    }

    #[test]
    fn test_invalid_days() {
        assert!(!is_valid_day(""));
        assert!(!is_valid_day("2024011"));
        assert!(!is_valid_day("202401155"));
        assert!(!is_valid_day("20240230"));
        assert!(!is_valid_day("20240431"));
        assert!(!is_valid_day("20230229"));
        assert!(!is_valid_day("2024-115"));
        assert!(!is_valid_day("18991231"));
        assert!(!is_valid_day("20241301"));
    }

    #[test]
    fn test_same_day() {
        assert!(same_day("20240115", "20240115"));
        assert!(!same_day("20240115", "20240116"));
        assert!(!same_day("invalid", "20240115"));
        assert!(!same_day("20240115", "invalid"));
        assert!(!same_day("invalid", "invalid"));
    }

    #[test]
    fn test_previous_day_crosses_boundaries() {
        assert_eq!(previous_day("20240115"), Some("20240114".to_string()));
        assert_eq!(previous_day("20240301"), Some("20240229".to_string()));
        assert_eq!(previous_day("20240101"), Some("20231231".to_string()));
        assert_eq!(previous_day("garbage"), None);
    }
}
