//! Lenient value coercion for device-supplied fields.
//!
//! Senders are loosely typed: coordinates arrive as numbers or numeric
//! strings, speeds as either. These helpers never fail. A value that does not
//! carry an integer coerces to `0`, and text coerces to `""` when absent.
//!
//! Time parsing is the exception: an unreadable `scheduled_time` is an error.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{FarmlinkError, Result};

/// Leading-integer coercion: `"12abc"` -> 12, `"abc"` -> 0, `3.9` -> 3.
pub fn coerce_int(v: &Value) -> i64 {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                n.as_f64().map(|f| f.trunc() as i64).unwrap_or(0)
            }
        }
        Value::String(s) => leading_int(s),
        _ => 0,
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut acc: i64 = 0;
    let mut seen = false;
    let mut prev_underscore = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => {
                let d = i64::from(c as u8 - b'0');
                acc = acc.saturating_mul(10).saturating_add(d);
                seen = true;
                prev_underscore = false;
            }
            // digit separators ("1_000"), but never two in a row or leading
            '_' if seen && !prev_underscore => prev_underscore = true,
            _ => break,
        }
    }

    if negative {
        -acc
    } else {
        acc
    }
}

/// Text coercion: strings as-is, scalars rendered, null/missing as `""`.
pub fn coerce_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Read a `time_stamp`-like identifier. Strings and numbers are accepted.
pub fn stamp_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a schedule entry's `scheduled_time`.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS +ZZZZ`, and naive date-times
/// (interpreted as UTC).
pub fn parse_scheduled_time(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(FarmlinkError::InvalidTime(format!("unparsable scheduled_time: {s:?}")))
}

/// Unix seconds with microsecond fraction, rendered like `1717228800.123456`.
pub fn epoch_float(at: DateTime<Utc>) -> String {
    let secs = at.timestamp_micros() as f64 / 1_000_000.0;
    let s = secs.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_from_numbers_and_strings() {
        assert_eq!(coerce_int(&json!(7)), 7);
        assert_eq!(coerce_int(&json!(-7)), -7);
        assert_eq!(coerce_int(&json!(3.9)), 3);
        assert_eq!(coerce_int(&json!("42")), 42);
        assert_eq!(coerce_int(&json!("  -5")), -5);
        assert_eq!(coerce_int(&json!("12abc")), 12);
        assert_eq!(coerce_int(&json!("3.9")), 3);
        assert_eq!(coerce_int(&json!("1_000")), 1000);
    }

    #[test]
    fn int_defaults_to_zero() {
        assert_eq!(coerce_int(&json!("abc")), 0);
        assert_eq!(coerce_int(&json!("")), 0);
        assert_eq!(coerce_int(&json!("-")), 0);
        assert_eq!(coerce_int(&json!(null)), 0);
        assert_eq!(coerce_int(&json!(true)), 0);
        assert_eq!(coerce_int(&json!([1])), 0);
    }

    #[test]
    fn text_renders_scalars() {
        assert_eq!(coerce_text(&json!("100")), "100");
        assert_eq!(coerce_text(&json!(100)), "100");
        assert_eq!(coerce_text(&json!(1.5)), "1.5");
        assert_eq!(coerce_text(&json!(null)), "");
    }

    #[test]
    fn scheduled_time_formats() {
        let a = parse_scheduled_time("2024-05-01T08:00:00Z").unwrap();
        let b = parse_scheduled_time("2024-05-01T10:00:00+02:00").unwrap();
        let c = parse_scheduled_time("2024-05-01 08:00:00").unwrap();
        let d = parse_scheduled_time("2024-05-01T08:00:00").unwrap();
        let e = parse_scheduled_time("2024-05-01 10:00:00 +0200").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a, e);
    }

    #[test]
    fn scheduled_time_rejects_garbage() {
        let err = parse_scheduled_time("next tuesday").unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    }

    #[test]
    fn epoch_float_keeps_fraction() {
        let at = Utc.timestamp_opt(1_717_228_800, 0).unwrap();
        assert_eq!(epoch_float(at), "1717228800.0");
        let at = Utc.timestamp_opt(1_717_228_800, 250_000_000).unwrap();
        assert_eq!(epoch_float(at), "1717228800.25");
    }
}
