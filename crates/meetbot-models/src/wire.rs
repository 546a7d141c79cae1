//! Wire formats for dates and times typed by users.
//!
//! Dates are `DD.MM.YYYY`; a dash separator (`DD-MM-YYYY`) is accepted too
//! as long as both separators match. Times are 24-hour `HH:MM`. Output
//! always uses the dotted form.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::error::{ModelError, Result};

static DATE_RE: OnceLock<Regex> = OnceLock::new();
static TIME_RE: OnceLock<Regex> = OnceLock::new();

fn date_re() -> &'static Regex {
    DATE_RE.get_or_init(|| {
        Regex::new(r"^(\d{2})([.\-])(\d{2})([.\-])(\d{4})$").expect("date pattern is valid")
    })
}

fn time_re() -> &'static Regex {
    TIME_RE.get_or_init(|| Regex::new(r"^(\d{2}):(\d{2})$").expect("time pattern is valid"))
}

/// Parse a user-supplied date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let invalid = || ModelError::InvalidDate(trimmed.to_string());

    let caps = date_re().captures(trimmed).ok_or_else(invalid)?;
    if caps[2] != caps[4] {
        return Err(invalid());
    }

    let day: u32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[3].parse().map_err(|_| invalid())?;
    let year: i32 = caps[5].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Parse a user-supplied 24-hour time.
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let trimmed = input.trim();
    let invalid = || ModelError::InvalidTime(trimmed.to_string());

    let caps = time_re().captures(trimmed).ok_or_else(invalid)?;
    let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
    let minute: u32 = caps[2].parse().map_err(|_| invalid())?;

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
