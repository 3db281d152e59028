//! Typed cell values for pre-filled records and example rows.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;
use tabform_core::{parse_timestamp, CellValue, FieldSpec, FormatKind};

/// `num_days_from_ce` of 1899-12-30, day zero of spreadsheet serial dates.
const SERIAL_EPOCH_DAYS: i64 = 693_594;

/// Spreadsheet serial number of a timestamp: days since 1899-12-30 plus the
/// fraction of the day.
pub fn excel_serial(ts: NaiveDateTime) -> f64 {
    let days = ts.date().num_days_from_ce() as i64 - SERIAL_EPOCH_DAYS;
    days as f64 + ts.time().num_seconds_from_midnight() as f64 / 86_400.0
}

/// Timestamp of a spreadsheet serial number, rounded to the second.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let total = (serial * 86_400.0).round() as i64;
    let days = i32::try_from(SERIAL_EPOCH_DAYS + total.div_euclid(86_400)).ok()?;
    let secs = total.rem_euclid(86_400) as u32;
    NaiveDate::from_num_days_from_ce_opt(days)?.and_hms_opt(secs / 3600, secs / 60 % 60, secs % 60)
}

/// Convert a record value to a cell for `field`. On failure returns what the
/// field expected.
pub fn coerce(field: &FieldSpec, value: &Value) -> Result<CellValue, &'static str> {
    if let Value::Array(items) = value {
        let joined = items.iter().map(plain_text).collect::<Vec<_>>().join(", ");
        return Ok(CellValue::Text(joined));
    }
    if let Value::Object(_) = value {
        return Err(expected(field.kind));
    }
    if let Value::String(s) = value {
        if s.trim().is_empty() {
            return Ok(CellValue::Text(s.clone()));
        }
    }

    match field.kind {
        FormatKind::Text | FormatKind::Choice | FormatKind::MultiChoice => Ok(CellValue::Text(plain_text(value))),
        FormatKind::Integer | FormatKind::Numeric | FormatKind::Money => match value {
            Value::Number(n) => n.as_f64().map(CellValue::Number).ok_or(expected(field.kind)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(CellValue::Number)
                .ok_or(expected(field.kind)),
            _ => Err(expected(field.kind)),
        },
        FormatKind::Boolean => match value {
            Value::Bool(b) => Ok(CellValue::Bool(*b)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(CellValue::Bool(true)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(CellValue::Bool(false)),
            _ => Err(expected(field.kind)),
        },
        FormatKind::Date => match value {
            Value::Number(n) => n.as_f64().map(CellValue::Number).ok_or(expected(field.kind)),
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|ts| CellValue::Number(excel_serial(ts)))
                .ok_or(expected(field.kind)),
            _ => Err(expected(field.kind)),
        },
        FormatKind::Timestamp => match value {
            Value::Number(n) => n.as_f64().map(CellValue::Number).ok_or(expected(field.kind)),
            Value::String(s) => parse_timestamp(s)
                .map(|ts| CellValue::Number(excel_serial(ts)))
                .ok_or(expected(field.kind)),
            _ => Err(expected(field.kind)),
        },
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn expected(kind: FormatKind) -> &'static str {
    match kind {
        FormatKind::Integer | FormatKind::Numeric | FormatKind::Money => "a number",
        FormatKind::Boolean => "TRUE or FALSE",
        FormatKind::Date => "a date (YYYY-MM-DD)",
        FormatKind::Timestamp => "a timestamp (YYYY-MM-DD hh:mm:ss)",
        FormatKind::Text | FormatKind::Choice | FormatKind::MultiChoice => "text",
    }
}
