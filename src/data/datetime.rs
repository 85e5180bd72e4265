use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::state::trip::{WeekOfMonth, Weekday};

/// Sentinel returned by `detect_date_format` for RFC 3339 timestamps
/// (e.g. `2023-08-01T00:25:04Z`). Offsets are dropped after conversion to UTC.
pub const RFC3339_FORMAT: &str = "__rfc3339__";

/// Candidate formats for timestamp columns that arrive as text.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%d/%m/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Export format for timestamps. Fractional seconds are written only when present.
pub const EXPORT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Pick the format that parses the largest share of the first 100 non-empty values.
pub fn detect_date_format(values: &[Option<&str>]) -> Option<&'static str> {
    let sample: Vec<&str> = values
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(100)
        .collect();

    if sample.is_empty() {
        return None;
    }

    let score = |fmt: &str| {
        sample.iter().filter(|s| parse_naive(s, fmt).is_some()).count() as f64 / sample.len() as f64
    };

    let mut best_format = None;
    let mut best_score = 0.0;
    for fmt in std::iter::once(RFC3339_FORMAT).chain(DATE_FORMATS.iter().copied()) {
        let s = score(fmt);
        if s > best_score {
            best_score = s;
            best_format = Some(fmt);
        }
    }
    best_format
}

/// Parse one value with a format from `DATE_FORMATS` or the RFC 3339 sentinel.
/// Date-only formats resolve to midnight.
pub fn parse_naive(value: &str, format: &str) -> Option<NaiveDateTime> {
    if format == RFC3339_FORMAT {
        return DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.naive_utc());
    }

    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value, format).ok()?.and_hms_opt(0, 0, 0))
}

/// Parse a text column. Returns `None` when no format matches any value;
/// values that fail the detected format become missing.
pub fn parse_column(values: &[Option<&str>]) -> Option<Vec<Option<NaiveDateTime>>> {
    let format = detect_date_format(values)?;
    Some(
        values
            .iter()
            .map(|v| v.and_then(|s| parse_naive(s.trim(), format)))
            .collect(),
    )
}

/// Microseconds since the Unix epoch to a naive UTC timestamp.
pub fn from_epoch_micros(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

/// Elapsed minutes from `start` to `end`. Negative when `end` is earlier.
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let elapsed = end - start;
    match elapsed.num_microseconds() {
        Some(micros) => micros as f64 / 60_000_000.0,
        None => elapsed.num_seconds() as f64 / 60.0,
    }
}

pub fn weekday_of(ts: NaiveDateTime) -> Weekday {
    ts.weekday().into()
}

pub fn hour_of(ts: NaiveDateTime) -> u32 {
    ts.hour()
}

pub fn day_of_month(ts: NaiveDateTime) -> u32 {
    ts.day()
}

pub fn week_of_month(ts: NaiveDateTime) -> u32 {
    WeekOfMonth::number_for_day(ts.day())
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(EXPORT_FORMAT).to_string()
}
