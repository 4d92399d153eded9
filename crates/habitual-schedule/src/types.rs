//! Schedule types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CronField, Crontab, ScheduleError};

/// Row id of a stored schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub i64);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which part of a two-part time a range error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    Hour,
    Minute,
    Second,
}

impl TimeField {
    /// Largest value this field can take on a clock.
    pub fn clock_max(self) -> u8 {
        match self {
            Self::Hour => 23,
            Self::Minute | Self::Second => 59,
        }
    }
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        })
    }
}

/// The single unit a recurrence interval steps by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Day,
    Hour,
    Minute,
}

impl IntervalUnit {
    /// Largest step accepted for this unit.
    ///
    /// The bounds are asymmetric on purpose: hour steps stop at 22 and minute
    /// steps at 58, matching the validator existing clients were built against.
    pub fn max_step(self) -> u8 {
        match self {
            Self::Day => 7,
            Self::Hour => 22,
            Self::Minute => 58,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
        })
    }
}

/// The wall-clock minute and hour a habit fires at, every day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub id: ScheduleId,
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn crontab(&self) -> Crontab {
        Crontab::new(
            CronField::Value(self.minute),
            CronField::Value(self.hour),
            CronField::Any,
        )
    }

    /// Rebuild from a stored row, rejecting rows that are not a daily clock time.
    pub fn from_crontab(id: ScheduleId, crontab: Crontab) -> Result<Self, ScheduleError> {
        match (crontab.minute, crontab.hour, crontab.day_of_month) {
            (CronField::Value(minute), CronField::Value(hour), CronField::Any) => {
                Ok(Self { id, hour, minute })
            }
            _ => Err(ScheduleError::UnexpectedShape {
                id,
                expected: "time of day",
                crontab: crontab.to_string(),
            }),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

/// How often a habit repeats: exactly one field carries a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecurrenceInterval {
    pub id: ScheduleId,
    pub unit: IntervalUnit,
    pub every: u8,
}

impl RecurrenceInterval {
    pub fn crontab(&self) -> Crontab {
        let step = CronField::Step(self.every);
        match self.unit {
            IntervalUnit::Day => Crontab::new(CronField::Any, CronField::Any, step),
            IntervalUnit::Hour => Crontab::new(CronField::Any, step, CronField::Any),
            IntervalUnit::Minute => Crontab::new(step, CronField::Any, CronField::Any),
        }
    }

    /// Rebuild from a stored row, rejecting rows that are not a single-field step.
    pub fn from_crontab(id: ScheduleId, crontab: Crontab) -> Result<Self, ScheduleError> {
        use CronField::{Any, Step};

        let (unit, every) = match (crontab.minute, crontab.hour, crontab.day_of_month) {
            (Any, Any, Step(n)) => (IntervalUnit::Day, n),
            (Any, Step(n), Any) => (IntervalUnit::Hour, n),
            (Step(n), Any, Any) => (IntervalUnit::Minute, n),
            _ => {
                return Err(ScheduleError::UnexpectedShape {
                    id,
                    expected: "recurrence interval",
                    crontab: crontab.to_string(),
                });
            }
        };
        Ok(Self { id, unit, every })
    }
}

/// The merged trigger a reminder job runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeSchedule {
    pub id: ScheduleId,
    pub crontab: Crontab,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_display_pads_minute() {
        let time = TimeOfDay {
            id: ScheduleId(1),
            hour: 7,
            minute: 5,
        };
        assert_eq!(time.to_string(), "7:05");
        assert_eq!(time.crontab().to_string(), "5 7 * * *");
    }

    #[test]
    fn test_interval_crontab_has_single_step() {
        let every = |unit| RecurrenceInterval {
            id: ScheduleId(1),
            unit,
            every: 3,
        };
        assert_eq!(every(IntervalUnit::Day).crontab().to_string(), "* * */3 * *");
        assert_eq!(every(IntervalUnit::Hour).crontab().to_string(), "* */3 * * *");
        assert_eq!(every(IntervalUnit::Minute).crontab().to_string(), "*/3 * * * *");
    }

    #[test]
    fn test_from_crontab_roundtrip() {
        let interval = RecurrenceInterval {
            id: ScheduleId(4),
            unit: IntervalUnit::Hour,
            every: 12,
        };
        let rebuilt = RecurrenceInterval::from_crontab(interval.id, interval.crontab()).unwrap();
        assert_eq!(rebuilt, interval);

        let time = TimeOfDay {
            id: ScheduleId(5),
            hour: 18,
            minute: 41,
        };
        assert_eq!(TimeOfDay::from_crontab(time.id, time.crontab()).unwrap(), time);
    }

    #[test]
    fn test_from_crontab_rejects_wrong_shape() {
        let time = TimeOfDay {
            id: ScheduleId(5),
            hour: 18,
            minute: 41,
        };
        let err = RecurrenceInterval::from_crontab(time.id, time.crontab()).unwrap_err();
        assert!(matches!(err, ScheduleError::UnexpectedShape { .. }));
    }
}
