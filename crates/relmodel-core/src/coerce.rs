//! Loose scalar coercions used at the filter and payload boundary.
//!
//! Callers hand us JSON produced by dynamically typed clients, so the casts
//! here follow the usual script-runtime rules: `String(x)`, `Number(x)`,
//! `Boolean(x)` and `new Date(x)`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Cast to a string the way `String(x)` does.
pub fn js_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        JsonValue::Object(_) => "[object Object]".to_string(),
    }
}

/// Cast to a number the way `Number(x)` does. Unparseable input yields NaN.
pub fn js_number(value: &JsonValue) -> f64 {
    match value {
        JsonValue::Null => 0.0,
        JsonValue::Bool(b) => f64::from(u8::from(*b)),
        JsonValue::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        JsonValue::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] if !single.is_array() && !single.is_object() => js_number(single),
            _ => f64::NAN,
        },
        JsonValue::Object(_) => f64::NAN,
    }
}

/// Truthiness the way `Boolean(x)` evaluates it.
pub fn js_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Construct a timestamp the way `new Date(x)` does.
///
/// Returns `None` for an invalid date. `null` is the epoch, numbers are
/// milliseconds since the epoch, strings accept RFC 3339, ISO-like
/// date-times and bare calendar dates (taken as UTC midnight).
pub fn js_date(value: &JsonValue) -> Option<NaiveDateTime> {
    match value {
        JsonValue::Null => DateTime::from_timestamp_millis(0).map(|d| d.naive_utc()),
        JsonValue::Number(n) => {
            let millis = n.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(millis.trunc() as i64).map(|d| d.naive_utc())
        }
        JsonValue::String(s) => parse_date_text(s),
        _ => None,
    }
}

/// Parse a stored column value as a timestamp. SQL `NULL` never parses.
pub fn stored_date(value: &JsonValue) -> Option<NaiveDateTime> {
    if value.is_null() { None } else { js_date(value) }
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    if let Some(stripped) = text.strip_suffix('Z') {
        if let Some(parsed) = parse_naive(stripped) {
            return Some(parsed);
        }
    }
    parse_naive(text)
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Calendar-date form (`YYYY-MM-DD`) of a timestamp.
pub fn calendar_date(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// ISO-8601 form with millisecond precision and a `Z` suffix.
pub fn iso_string(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn format_number(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
