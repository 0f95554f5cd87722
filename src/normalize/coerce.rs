// src/normalize/coerce.rs
//! Scalar coercions applied while flattening: timestamps and primitive strings.
//!
//! Every function here is total. A string that does not look like a timestamp
//! or a primitive is handed back unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

/// Keys ending in `time`, `on`, `at` or `date` at a word boundary:
/// `created_at`, `createdOn`, `LAST-LOGIN-TIME`, `date`.
static TIME_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:.*[_\-.\s](?i:time|on|at|date)|.*[a-z0-9](?:Time|On|At|Date|TIME|ON|AT|DATE)|(?i:time|on|at|date))$",
    )
    .expect("Failed to compile time key regex - this is a bug in the code")
});

/// Decimal numbers without leading zeros, so identifiers like `007` stay text.
static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?$")
        .expect("Failed to compile numeric regex - this is a bug in the code")
});

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Whether a property name denotes a point in time.
pub fn is_time_key(key: &str) -> bool {
    TIME_KEY_REGEX.is_match(key)
}

/// Parses a timestamp string into epoch milliseconds.
///
/// Accepts RFC 3339 / ISO 8601 with an offset, ISO 8601 without an offset
/// (read as UTC), bare dates (midnight UTC) and RFC 2822.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().timestamp_millis());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp_millis());
    }

    None
}

/// Interprets `"true"`/`"false"` as booleans and numeric text as numbers.
pub fn parse_primitive(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if NUMERIC_REGEX.is_match(raw) {
        if let Ok(int) = raw.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }

    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn time_keys_at_word_boundaries() {
        for key in [
            "created_at",
            "createdAt",
            "createdOn",
            "created-on",
            "lastLoginTime",
            "LAST_LOGIN_TIME",
            "expiration.date",
            "startDate",
            "date",
            "Time",
        ] {
            assert!(is_time_key(key), "{} should be a time key", key);
        }
    }

    #[test]
    fn ordinary_words_are_not_time_keys() {
        for key in ["description", "region", "format", "location", "update", "mandate"] {
            assert!(!is_time_key(key), "{} should not be a time key", key);
        }
    }

    #[test]
    fn parses_iso_8601_variants() {
        assert_eq!(parse_timestamp_millis("2021-03-04T05:06:07Z"), Some(1_614_834_367_000));
        assert_eq!(
            parse_timestamp_millis("2021-03-04T05:06:07.5+00:00"),
            Some(1_614_834_367_500)
        );
        assert_eq!(parse_timestamp_millis("2021-03-04T05:06:07"), Some(1_614_834_367_000));
        assert_eq!(parse_timestamp_millis("2021-03-04"), Some(1_614_816_000_000));
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:00Z"), Some(0));
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(parse_timestamp_millis("not-a-date"), None);
        assert_eq!(parse_timestamp_millis(""), None);
        assert_eq!(parse_timestamp_millis("2021-13-45"), None);
    }

    #[test]
    fn primitive_parsing() {
        assert_eq!(parse_primitive("true"), json!(true));
        assert_eq!(parse_primitive("false"), json!(false));
        assert_eq!(parse_primitive("42"), json!(42));
        assert_eq!(parse_primitive("-1.5"), json!(-1.5));
        assert_eq!(parse_primitive("007"), json!("007"));
        assert_eq!(parse_primitive("True"), json!("True"));
        assert_eq!(parse_primitive("12abc"), json!("12abc"));
    }
}
