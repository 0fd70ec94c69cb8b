use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single decoded cell. Absent values are represented as `None` by the
/// containers holding `Option<Value>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Text(s) => s.clone(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Floats keep a fractional part so a float column never reads back as
/// integers (`3.0`, not `3`).
fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    format!("{value:?}")
}

/// Renders a cell for CSV output, substituting `missing` for absent values.
pub fn render_cell(value: Option<&Value>, missing: &str) -> String {
    match value {
        Some(value) => value.as_display(),
        None => missing.to_string(),
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

/// Parses a timestamp in any of the accepted layouts. A bare date is taken
/// as midnight.
pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let trimmed = value.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = parse_naive_date(trimmed) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_naive_date_supports_multiple_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_naive_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_naive_date("06/05/2024").unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/06").unwrap(), expected);
    }

    #[test]
    fn parse_naive_datetime_supports_multiple_formats() {
        let expected =
            NaiveDateTime::parse_from_str("2024-05-06 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            parse_naive_datetime("2024-05-06T14:30:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_datetime("06/05/2024 14:30:00").unwrap(),
            expected
        );
        assert_eq!(parse_naive_datetime("2024-05-06 14:30").unwrap(), expected);
    }

    #[test]
    fn parse_naive_datetime_accepts_bare_dates_and_fractions() {
        let midnight = parse_naive_datetime("2024-05-06").unwrap();
        assert_eq!(midnight.to_string(), "2024-05-06 00:00:00");

        let fractional = parse_naive_datetime("2024-05-06 14:30:00.250").unwrap();
        assert_eq!(
            Value::DateTime(fractional).as_display(),
            "2024-05-06 14:30:00.250"
        );
        assert!(parse_naive_datetime("not a date").is_err());
    }

    #[test]
    fn floats_keep_fractional_marker() {
        assert_eq!(Value::Float(3.0).as_display(), "3.0");
        assert_eq!(Value::Float(12.5).as_display(), "12.5");
        assert_eq!(Value::Float(-0.25).as_display(), "-0.25");
        assert_eq!(Value::Integer(42).as_display(), "42");
    }

    #[test]
    fn whole_timestamps_render_without_fraction() {
        let dt = parse_naive_datetime("2024-01-05 10:00:00").unwrap();
        assert_eq!(Value::DateTime(dt).as_display(), "2024-01-05 10:00:00");
    }

    #[test]
    fn render_cell_substitutes_missing_marker() {
        assert_eq!(render_cell(None, ""), "");
        assert_eq!(render_cell(None, "NA"), "NA");
        assert_eq!(render_cell(Some(&Value::Text("x".into())), "NA"), "x");
    }
}
