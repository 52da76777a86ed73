//! Date conversions shared by both backends.
//!
//! Input dates are ISO (`YYYY-MM-DD`). The CSV file and every record handed to
//! callers carry the display form (`DD-MM-YYYY`). The remote store keeps an
//! RFC 3339 timestamp, but older documents may hold other shapes, so reads go
//! through [`normalize_remote`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value;

pub const ISO_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";

pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), ISO_FORMAT).ok()
}

pub fn parse_display(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DISPLAY_FORMAT).ok()
}

pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Midnight UTC of `date`, e.g. `2025-11-02T00:00:00Z`.
pub fn to_remote(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Converts whatever the remote store returned for `data` into the display
/// form. Unrecognised strings are passed through untouched; null and other
/// shapes become an empty string.
pub fn normalize_remote(value: &Value) -> String {
    match remote_date(value) {
        Some(date) => to_display(date),
        None => match value {
            Value::String(s) => s.clone(),
            _ => String::new(),
        },
    }
}

fn remote_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => date_from_str(s),
        Value::Number(n) => n.as_i64().and_then(date_from_millis),
        Value::Object(map) => {
            if let Some(inner) = map.get("$date") {
                return remote_date(inner);
            }
            match map.get("$numberLong") {
                Some(Value::String(ms)) => ms.parse().ok().and_then(date_from_millis),
                _ => None,
            }
        }
        _ => None,
    }
}

fn date_from_millis(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

fn date_from_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    parse_iso(s).or_else(|| parse_display(s))
}
