use super::keys::GroupKey;
use crate::errors::{AnalysisError, Result};
use crate::time_utils::{month_start, season_of_month};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// Calendar components that can be derived from a timestamp coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarField {
    Year,
    /// Month number 1-12
    Month,
    /// Day of month 1-31
    Day,
    /// Ordinal day 1-366
    DayOfYear,
    /// Monday = 0 ... Sunday = 6
    DayOfWeek,
    Hour,
    /// `DJF`, `MAM`, `JJA` or `SON`
    Season,
    /// Timestamp truncated to the first instant of its month
    MonthPeriod,
}

impl CalendarField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::DayOfYear => "dayofyear",
            Self::DayOfWeek => "dayofweek",
            Self::Hour => "hour",
            Self::Season => "season",
            Self::MonthPeriod => "month_period",
        }
    }

    /// Key of a timestamp; a pure function of the timestamp alone
    pub fn extract(self, timestamp: &NaiveDateTime) -> Option<GroupKey> {
        match self {
            Self::Year => Some(GroupKey::Int(timestamp.year() as i64)),
            Self::Month => Some(GroupKey::Int(timestamp.month() as i64)),
            Self::Day => Some(GroupKey::Int(timestamp.day() as i64)),
            Self::DayOfYear => Some(GroupKey::Int(timestamp.ordinal() as i64)),
            Self::DayOfWeek => Some(GroupKey::Int(
                timestamp.weekday().num_days_from_monday() as i64,
            )),
            Self::Hour => Some(GroupKey::Int(timestamp.hour() as i64)),
            Self::Season => Some(GroupKey::Label(
                season_of_month(timestamp.month()).to_string(),
            )),
            Self::MonthPeriod => month_start(timestamp).map(GroupKey::Time),
        }
    }
}

impl fmt::Display for CalendarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarField {
    type Err = AnalysisError;

    /// Accepts bare names (`month`) and accessor form (`time.month`)
    fn from_str(s: &str) -> Result<Self> {
        let field = s.rsplit('.').next().unwrap_or(s).to_lowercase();
        match field.as_str() {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            "dayofyear" | "doy" => Ok(Self::DayOfYear),
            "dayofweek" | "weekday" => Ok(Self::DayOfWeek),
            "hour" => Ok(Self::Hour),
            "season" => Ok(Self::Season),
            "month_period" | "yearmonth" => Ok(Self::MonthPeriod),
            _ => Err(AnalysisError::Parse(format!("Unknown calendar field: {}", s))),
        }
    }
}
