//! Error types for habits and reminder jobs.

use thiserror::Error;

use crate::{HabitId, OwnerId, ValidationErrors};

/// Errors that can occur in habit and reminder operations.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Schedule engine error.
    #[error("schedule error: {0}")]
    Schedule(#[from] habitual_schedule::ScheduleError),

    /// SQLite error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// JSON error in a stored job payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The draft failed one or more field validators.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Habit not found.
    #[error("habit not found: {0}")]
    HabitNotFound(HabitId),

    /// Owner not found.
    #[error("owner not found: {0}")]
    OwnerNotFound(OwnerId),

    /// No owner registered with this phone number.
    #[error("no owner with phone {0}")]
    PhoneNotFound(String),

    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The database lock was poisoned by a panicking thread.
    #[error("database lock poisoned")]
    Poisoned,
}

impl From<ValidationErrors> for ReminderError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
