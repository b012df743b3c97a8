//! Shared helpers for date/time parsing and formatting.
//!
//! Client payloads and Open-Meteo responses use slightly different ISO 8601
//! shapes (`2025-05-09`, `2025-05-09T05:52`, `2025-05-09T05:52:00`), so
//! everything that enters the service goes through `parse_datetime`.
//! Everything that leaves it is formatted with `format_datetime`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Output format for every timestamp in API responses.
const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepted date-time layouts, tried in order.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a date or date-time string. A bare date resolves to midnight.
pub(crate) fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    for fmt in &DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a calendar day, ignoring any time-of-day component.
pub(crate) fn parse_day(input: &str) -> Option<NaiveDate> {
    parse_datetime(input).map(|dt| dt.date())
}

/// Half-open interval `[day 00:00:00, day+1 00:00:00)`.
pub(crate) fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    let end = day
        .succ_opt()
        .map(|next| next.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);
    (start, end)
}

pub(crate) fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(OUTPUT_FORMAT).to_string()
}

pub(crate) fn opt_format_datetime(dt: Option<NaiveDateTime>) -> Option<String> {
    dt.map(format_datetime)
}
