use crate::errors::{AnalysisError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

pub fn julian(year: i64, month: i64, day: i64) -> i64 {
    day - 32075
        + 1461 * (year + 4800 + (month - 14) / 12) / 4
        + 367 * (month - 2 - (month - 14) / 12 * 12) / 12
        - 3 * ((year + 4900 + (month - 14) / 12) / 100) / 4
}

pub fn gregorian(jd: i64) -> (i64, i64, i64) {
    let l = jd + 68569;
    let n = 4 * l / 146097;
    let l = l - (146097 * n + 3) / 4;
    let i = 4000 * (l + 1) / 1461001;
    let l = l - 1461 * i / 4 + 31;
    let j = 80 * l / 2447;
    let k = l - 2447 * j / 80;
    let l = j / 11;
    let j = j + 2 - 12 * l;
    let i = 100 * (n - 49) + i + l;

    (i, j, k)
}

/// Julian day number of the calendar date of a timestamp
pub fn julian_day(timestamp: &NaiveDateTime) -> i64 {
    julian(
        timestamp.year() as i64,
        timestamp.month() as i64,
        timestamp.day() as i64,
    )
}

/// Midnight of the date with the given Julian day number
pub fn from_julian_day(jd: i64) -> Option<NaiveDateTime> {
    let (year, month, day) = gregorian(jd);
    midnight(year as i32, month as u32, day)
}

/// Number of whole calendar months between the month of `origin` and the month of `timestamp`
pub fn months_between(origin: &NaiveDateTime, timestamp: &NaiveDateTime) -> i64 {
    (timestamp.year() as i64 - origin.year() as i64) * 12 + timestamp.month() as i64
        - origin.month() as i64
}

/// First instant of the month containing `timestamp`
pub fn month_start(timestamp: &NaiveDateTime) -> Option<NaiveDateTime> {
    midnight(timestamp.year(), timestamp.month(), 1)
}

/// First instant of the month `months` months after the month of `origin`
pub fn add_months(origin: &NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let total = (origin.year() as i64 * 12 + origin.month0() as i64).checked_add(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = total.rem_euclid(12) as u32 + 1;
    midnight(year, month, 1)
}

fn midnight(year: i32, month: u32, day: i64) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, u32::try_from(day).ok()?)?.and_hms_opt(0, 0, 0)
}

/// Calculate the number of days in a given month
pub fn days_in_month(year: i32, month: u8) -> Option<u8> {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => Some(31),
        4 | 6 | 9 | 11 => Some(30),
        2 => {
            if is_leap_year(year) {
                Some(29)
            } else {
                Some(28)
            }
        }
        _ => None,
    }
}

/// Check if a year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Meteorological season label for a month number
pub fn season_of_month(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "DJF",
        3..=5 => "MAM",
        6..=8 => "JJA",
        _ => "SON",
    }
}

/// Parse a timestamp in one of the accepted layouts:
/// `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` or `YYYY-MM`
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(timestamp);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(timestamp) = date.and_hms_opt(0, 0, 0) {
            return Ok(timestamp);
        }
    }

    // Year-month periods, e.g. "2001-07"
    if let Some((year, month)) = text.split_once('-') {
        if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
            if let Some(timestamp) = midnight(year, month, 1) {
                return Ok(timestamp);
            }
        }
    }

    Err(AnalysisError::Parse(format!(
        "Could not parse time string: {}",
        text
    )))
}

/// Format a timestamp the way coordinate columns are written
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
}
