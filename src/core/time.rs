//! Shared timestamp, civil-date, and envelope helpers.

use crate::core::error::RegistroError;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::fmt;
use ulid::Ulid;

/// Unix-epoch seconds with a trailing `Z` (e.g. `1771220592Z`), the
/// timestamp form used by every store column and audit event.
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}Z", now.as_secs())
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Response envelope every CLI command emits in JSON mode. Payload keys
/// from `extra` are merged beside the fixed header fields.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut envelope = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(fields), Some(extra_obj)) = (envelope.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            fields.insert(k.clone(), v.clone());
        }
    }
    envelope
}

/// Civil date carried by production registers, stored as `YYYY-MM-DD` text.
///
/// Hand-rolled on purpose: register dates never need timezones or clock
/// arithmetic, only calendar validity, month grouping, and epoch bounds for
/// range filters against `data_criacao` timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    year: i32,
    month: u32,
    day: u32,
}

impl Date {
    pub fn parse(s: &str) -> Result<Self, RegistroError> {
        // ASCII digits only; the byte slices below depend on it.
        let shape = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap();
        if !shape.is_match(s) {
            return Err(RegistroError::ValidationError(format!(
                "date must be YYYY-MM-DD, got '{}'",
                s
            )));
        }
        let year: i32 = s[0..4].parse().map_err(|_| {
            RegistroError::ValidationError(format!("unparseable year in '{}'", s))
        })?;
        let month: u32 = s[5..7].parse().map_err(|_| {
            RegistroError::ValidationError(format!("unparseable month in '{}'", s))
        })?;
        let day: u32 = s[8..10].parse().map_err(|_| {
            RegistroError::ValidationError(format!("unparseable day in '{}'", s))
        })?;
        if !(1..=12).contains(&month) {
            return Err(RegistroError::ValidationError(format!(
                "month out of range in '{}'",
                s
            )));
        }
        if day < 1 || day > days_in_month(year, month) {
            return Err(RegistroError::ValidationError(format!(
                "day out of range in '{}'",
                s
            )));
        }
        Ok(Date { year, month, day })
    }

    /// `YYYY-MM` prefix shared by every register of the same month.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Epoch seconds at UTC midnight starting this date.
    pub fn epoch_day_start(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day) * 86_400
    }

    /// Epoch seconds at the last second of this date (inclusive range bound).
    pub fn epoch_day_end(&self) -> i64 {
        self.epoch_day_start() + 86_399
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Days since 1970-01-01 for a civil date (proleptic Gregorian).
fn days_from_civil(y: i32, m: u32, d: u32) -> i64 {
    let y = y as i64 - if m <= 2 { 1 } else { 0 };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * (m as i64 + if m > 2 { -3 } else { 9 }) + 2) / 5 + d as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
