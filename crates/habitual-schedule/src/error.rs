//! Error types for the schedule engine.

use thiserror::Error;

use crate::{IntervalUnit, ScheduleId, TimeField};

/// A user-supplied schedule string failed validation.
///
/// Every variant is scoped to a single input field; callers decide which
/// field name to report it under.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The input contains whitespace.
    #[error("\"{0}\" contains spaces, which is not allowed")]
    Whitespace(String),

    /// A two-part time is missing its single `:` separator.
    #[error("\"{0}\" is not valid for this field, use the \":\" separator, e.g. \"18:30\"")]
    Format(String),

    /// A two-part time has a non-numeric part.
    #[error("time values can only be numeric")]
    NotNumeric(String),

    /// A time of day has an hour or minute outside the clock.
    #[error("{field} value cannot be less than 0 or greater than {max}", max = .field.clock_max())]
    TimeOfDayRange { field: TimeField },

    /// A duration has a minute or second outside `0..60`.
    #[error("{field} value is not valid")]
    DurationRange { field: TimeField },

    /// A duration exceeds the two-minute cap.
    #[error("more than two minutes were given")]
    DurationCap,

    /// An interval is not three `/`-separated integers.
    #[error("\"{0}\" must be an interval like \"7/0/0\", meaning every 7 days")]
    IntervalFormat(String),

    /// Every interval field is zero.
    #[error("the interval cannot be empty, one of the values must be set")]
    EmptyInterval,

    /// More than one interval field is non-zero.
    #[error("an interval cannot set days, hours or minutes at the same time")]
    MultipleUnits,

    /// The selected interval unit is outside its bound.
    #[error("{unit} value must be between 0 and {max}", max = .unit.max_step())]
    IntervalOutOfRange { unit: IntervalUnit },
}

/// Errors that can occur in schedule operations.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// SQLite error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A stored crontab field could not be parsed.
    #[error("invalid crontab field: {0}")]
    InvalidField(String),

    /// No schedule row with this id.
    #[error("schedule not found: {0}")]
    NotFound(ScheduleId),

    /// A schedule row exists but does not have the expected shape.
    #[error("schedule {id} is not a {expected}: {crontab}")]
    UnexpectedShape {
        id: ScheduleId,
        expected: &'static str,
        crontab: String,
    },
}
