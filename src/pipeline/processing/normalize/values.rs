//! Coercion of decoded spreadsheet cells into text, identifiers and dates.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

/// Placeholder some spreadsheet exports leave behind for empty numeric cells
const NOT_A_NUMBER: &str = "nan";

/// Day zero of the spreadsheet serial date system
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// 9999-12-31 as a serial date
const SERIAL_MAX: f64 = 2_958_465.0;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// True for empty, whitespace-only and `nan` text
pub fn is_blank(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_A_NUMBER)
}

/// Render a cell as text. Missing, null and `nan` cells become the empty string.
/// Non-blank strings are kept verbatim.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) if is_blank(s) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => format_number(n),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Render a cell as an identifier: text, trimmed, with `nan` scrubbed.
/// Integral floats lose their fractional part so `1001.0` matches `"1001"`.
pub fn cell_identifier(value: Option<&Value>) -> String {
    cell_text(value).trim().to_string()
}

/// Scrub a rendered identifier the same way `cell_identifier` does
pub fn scrub_identifier(text: &str) -> String {
    if is_blank(text) {
        String::new()
    } else {
        text.trim().to_string()
    }
}

pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Parse a cell into a calendar date. Strings are tried against the known
/// export formats; numbers are spreadsheet serial dates. Anything else is no date.
pub fn cell_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value? {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n.as_f64().and_then(serial_to_date),
        _ => None,
    }
}

pub fn parse_date_str(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if is_blank(text) {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.date_naive())
        .ok()
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > SERIAL_MAX {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
