/// Time, date and greeting strings for the dashboard header
use chrono::{NaiveDateTime, Timelike};

use crate::settings::TimeFormat;

/// How often the time line is redrawn
pub const TIME_REFRESH_MS: u32 = 1_000;
/// How often the greeting is recomputed
pub const GREETING_REFRESH_MS: u32 = 60_000;

pub fn time_text(now: NaiveDateTime, format: TimeFormat, seconds: bool) -> String {
    let pattern = match (format, seconds) {
        (TimeFormat::TwentyFourHour, false) => "%H:%M",
        (TimeFormat::TwentyFourHour, true) => "%H:%M:%S",
        (TimeFormat::TwelveHour, false) => "%-I:%M %p",
        (TimeFormat::TwelveHour, true) => "%-I:%M:%S %p",
    };
    now.format(pattern).to_string()
}

/// `Monday, January 15`
pub fn date_text(now: NaiveDateTime) -> String {
    now.format("%A, %B %-d").to_string()
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..6 => "Up late? Get some rest!",
        6..12 => "Good morning!",
        12..18 => "Good afternoon!",
        _ => "Good evening!",
    }
}

pub fn greeting_at(now: NaiveDateTime) -> &'static str {
    greeting(now.hour())
}
