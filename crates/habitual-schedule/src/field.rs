//! Crontab fields and the minute/hour/day-of-month triple.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::ScheduleError;

/// A single crontab field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CronField {
    /// Wildcard (`*`), every unit.
    Any,
    /// A fixed value (`18`).
    Value(u8),
    /// Every N units (`*/2`).
    Step(u8),
}

impl CronField {
    /// Whether this field is the full wildcard.
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// The step size, if this field is a step marker.
    pub fn step(&self) -> Option<u8> {
        match self {
            Self::Step(n) => Some(*n),
            _ => None,
        }
    }

    /// Check if the field matches `value`, where `origin` is the first value
    /// of the field's range (0 for minutes and hours, 1 for days of the month).
    pub fn matches(&self, value: u32, origin: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Value(v) => u32::from(*v) == value,
            Self::Step(0) => false,
            Self::Step(n) => value
                .checked_sub(origin)
                .is_some_and(|offset| offset % u32::from(*n) == 0),
        }
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Value(v) => write!(f, "{v}"),
            Self::Step(n) => write!(f, "*/{n}"),
        }
    }
}

impl FromStr for CronField {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidField(s.to_string());
        if s == "*" {
            return Ok(Self::Any);
        }
        if let Some(step) = s.strip_prefix("*/") {
            let n: u8 = step.parse().map_err(|_| invalid())?;
            if n == 0 {
                return Err(invalid());
            }
            return Ok(Self::Step(n));
        }
        s.parse().map(Self::Value).map_err(|_| invalid())
    }
}

impl From<CronField> for String {
    fn from(field: CronField) -> Self {
        field.to_string()
    }
}

impl TryFrom<String> for CronField {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The minute/hour/day-of-month triple handed to the job scheduler.
///
/// Month and weekday are always `*`, so [`Display`](fmt::Display) renders a
/// standard five-field cron expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crontab {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
}

impl Crontab {
    pub const fn new(minute: CronField, hour: CronField, day_of_month: CronField) -> Self {
        Self {
            minute,
            hour,
            day_of_month,
        }
    }

    /// Check whether a wall-clock time falls on this schedule.
    pub fn matches<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        self.minute.matches(at.minute(), 0)
            && self.hour.matches(at.hour(), 0)
            && self.day_of_month.matches(at.day(), 1)
    }
}

impl fmt::Display for Crontab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} * *", self.minute, self.hour, self.day_of_month)
    }
}
