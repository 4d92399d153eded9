//! Schedule engine for Habitual.
//!
//! This crate turns free-text habit timing into crontab triples:
//! - Validates `HH:MM` times of day and `M:SS` durations
//! - Parses `D/H/M` recurrence intervals into a single step unit
//! - Interns schedules in SQLite so identical triples share one row
//! - Merges a time of day with an interval into the trigger a reminder job runs on
//! - Renders a periodicity phrase for outbound reminders

mod error;
mod field;
mod interval;
mod merge;
mod periodicity;
mod store;
mod types;
mod validate;

pub use error::{ScheduleError, ValidationError};
pub use field::{CronField, Crontab};
pub use interval::{DEFAULT_INTERVAL, parse_interval};
pub use merge::{merge, merge_crontab};
pub use periodicity::{Language, PluralForm, describe};
pub use store::{ScheduleStore, migrate};
pub use types::{CompositeSchedule, IntervalUnit, RecurrenceInterval, ScheduleId, TimeField, TimeOfDay};
pub use validate::{MAX_DURATION_MINUTES, validate_duration, validate_time_of_day, validate_two_part};
