//! Habit records and reminder jobs for Habitual.
//!
//! This crate provides:
//! - SQLite storage for owners, habits and reminder jobs
//! - Validators for habit drafts, collected per field
//! - Reminder job binding: create, refresh, delete and chat activation
//! - A habit service that runs each operation in one transaction
//! - A dispatcher loop that hands due reminders to an executor

mod binding;
mod config;
mod db;
mod dispatcher;
mod error;
mod habits;
mod jobs;
mod service;
mod types;
mod validators;

pub use binding::{REMINDER_TASK, ReminderBinding, job_name, start_time};
pub use config::ReminderConfig;
pub use db::HabitDb;
pub use dispatcher::{Dispatcher, ReminderExecutor};
pub use error::ReminderError;
pub use habits::HabitRepo;
pub use jobs::JobRepo;
pub use service::{BindOutcome, HabitService};
pub use types::{Habit, HabitId, Owner, OwnerId, ReminderArgs, ReminderJob};
pub use validators::{
    DraftContext, Field, FieldError, HabitDraft, VALIDATORS, ValidationErrors, Validator,
    validate_draft,
};
