//! Date parsing for export fields.
//!
//! Exports mix ISO timestamps, day-first slashed dates and month names, and
//! spreadsheet sources hand back serial numbers. Day-first wins when a
//! value is ambiguous (`03/04/2020` is 3 April).

use auditpaper_engine::Scalar;
use chrono::{Duration, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d-%b-%Y %I:%M:%S %p",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
];

/// Largest serial Excel accepts (31 December 9999).
const MAX_SERIAL: f64 = 2_958_465.0;

pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Excel serial date (1900 system) to a calendar date.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

pub fn parse_scalar(value: &Scalar) -> Option<NaiveDate> {
    match value {
        Scalar::Date(d) => Some(*d),
        Scalar::Number(n) => from_excel_serial(*n),
        Scalar::Text(s) => {
            let parsed = parse_date_str(s);
            if parsed.is_none() {
                log::warn!("unparsable date '{s}'");
            }
            parsed
        }
    }
}
