//! Binding habits to recurring reminder jobs.
//!
//! A job is created with its habit, refreshed when the habit's time of day or
//! interval changes, enabled once the owner is reachable in chat, and deleted
//! with the habit.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use habitual_schedule::{RecurrenceInterval, ScheduleStore, TimeOfDay, merge};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::{
    Habit, HabitId, JobRepo, OwnerId, ReminderArgs, ReminderConfig, ReminderError, ReminderJob,
};

/// Task identifier every reminder job invokes.
pub const REMINDER_TASK: &str = "habitual.send_habit_reminder";

/// Unique job name for a habit.
///
/// Contains `_<habit>/` for per-habit lookup and ends with `/U-<owner>` for
/// per-owner lookup.
pub fn job_name(habit: HabitId, owner: OwnerId) -> String {
    format!("task_reminder_{habit}/U-{owner}")
}

/// `time_of_day` on `date` in the given zone.
pub fn start_time(
    date: NaiveDate,
    time_of_day: &TimeOfDay,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, ReminderError> {
    date.and_hms_opt(u32::from(time_of_day.hour), u32::from(time_of_day.minute), 0)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .ok_or_else(|| ReminderError::InvalidTimestamp(format!("{date} {time_of_day}")))
}

/// Job binding operations on one connection, usually a transaction.
pub struct ReminderBinding<'c> {
    conn: &'c Connection,
    config: ReminderConfig,
}

impl<'c> ReminderBinding<'c> {
    pub fn new(conn: &'c Connection, config: ReminderConfig) -> Self {
        Self { conn, config }
    }

    fn today(&self) -> NaiveDate {
        self.config.now().date_naive()
    }

    /// Create the job for a new habit.
    ///
    /// The job starts today at the habit's time of day and is enabled only
    /// when a chat to deliver to is known.
    #[tracing::instrument(skip_all, fields(habit_id = %habit.id))]
    pub fn create(
        &self,
        habit: &Habit,
        time_of_day: &TimeOfDay,
        interval: &RecurrenceInterval,
        chat_id: Option<i64>,
    ) -> Result<ReminderJob, ReminderError> {
        let schedule = merge(&ScheduleStore::new(self.conn), time_of_day, interval)?;
        let job = ReminderJob {
            id: 0,
            name: job_name(habit.id, habit.owner_id),
            task: REMINDER_TASK.to_string(),
            schedule,
            start_time: start_time(self.today(), time_of_day, self.config.utc_offset)?,
            enabled: chat_id.is_some(),
            expire_seconds: self.config.expire_seconds,
            args: ReminderArgs {
                habit_id: habit.id,
                chat_id,
            },
            last_run_at: None,
            revision: 0,
            changed_at: Utc::now(),
        };

        let job = JobRepo::new(self.conn).insert(&job)?;
        info!(
            job = %job.name,
            schedule = %job.schedule.crontab,
            start_time = %job.start_time,
            enabled = job.enabled,
            "created reminder job"
        );
        Ok(job)
    }

    /// Refresh the job after the habit's time of day and/or interval changed.
    ///
    /// `None` means that input is unchanged and the habit's own value is used.
    /// A habit without a job is left alone.
    ///
    /// The job is saved disabled and then saved enabled again. The scheduler
    /// only notices a new trigger when the enabled flag flips, so both writes
    /// are required.
    #[tracing::instrument(skip_all, fields(habit_id = %habit.id))]
    pub fn update(
        &self,
        habit: &Habit,
        changed_time_of_day: Option<&TimeOfDay>,
        changed_interval: Option<&RecurrenceInterval>,
    ) -> Result<Option<ReminderJob>, ReminderError> {
        let jobs = JobRepo::new(self.conn);
        let Some(mut job) = jobs.for_habit(habit.id)? else {
            debug!("habit has no reminder job, nothing to update");
            return Ok(None);
        };

        if let Some(time_of_day) = changed_time_of_day {
            job.start_time = start_time(self.today(), time_of_day, self.config.utc_offset)?;
        }
        if changed_time_of_day.is_some() || changed_interval.is_some() {
            job.schedule = merge(
                &ScheduleStore::new(self.conn),
                changed_time_of_day.unwrap_or(&habit.time_to_do),
                changed_interval.unwrap_or(&habit.interval),
            )?;
        }

        job.enabled = false;
        jobs.save(&mut job)?;
        job.enabled = true;
        jobs.save(&mut job)?;

        info!(
            job = %job.name,
            schedule = %job.schedule.crontab,
            start_time = %job.start_time,
            revision = job.revision,
            "refreshed reminder job"
        );
        Ok(Some(job))
    }

    /// Remove the job of a habit. Returns how many jobs were removed.
    pub fn delete(&self, habit: HabitId) -> Result<usize, ReminderError> {
        let deleted = JobRepo::new(self.conn).delete_for_habit(habit)?;
        if deleted > 0 {
            info!(habit_id = %habit, deleted, "deleted reminder job");
        }
        Ok(deleted)
    }

    /// Enable every disabled job of an owner who just became reachable,
    /// pointing them at `chat_id`. Returns how many jobs were enabled.
    #[tracing::instrument(skip(self))]
    pub fn bind_chat(&self, owner: OwnerId, chat_id: i64) -> Result<usize, ReminderError> {
        let jobs = JobRepo::new(self.conn);
        let mut enabled = 0;
        for mut job in jobs.for_owner(owner)?.into_iter().filter(|j| !j.enabled) {
            job.enabled = true;
            job.args.chat_id = Some(chat_id);
            jobs.save(&mut job)?;
            enabled += 1;
        }
        info!(enabled, "enabled reminder jobs for chat");
        Ok(enabled)
    }

    /// Set the enabled flag of a job by name.
    ///
    /// Idempotent: returns `Ok(false)` without writing when the job is
    /// missing or already in the requested state.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool, ReminderError> {
        let jobs = JobRepo::new(self.conn);
        match jobs.by_name(name)? {
            Some(mut job) if job.enabled != enabled => {
                job.enabled = enabled;
                jobs.save(&mut job)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use habitual_schedule::ScheduleId;

    #[test]
    fn test_job_name_is_greppable() {
        let name = job_name(HabitId(12), OwnerId(3));
        assert_eq!(name, "task_reminder_12/U-3");
        assert!(name.contains("_12"));
        assert!(name.contains("U-3"));
    }

    #[test]
    fn test_start_time_uses_local_zone() {
        let offset = FixedOffset::east_opt(6 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let time = TimeOfDay {
            id: ScheduleId(1),
            hour: 18,
            minute: 41,
        };

        let start = start_time(date, &time, offset).unwrap();
        assert_eq!((start.hour(), start.minute()), (18, 41));
        assert_eq!(start.offset(), &offset);
        // 18:41 at +06:00 is 12:41 UTC
        assert_eq!(start.with_timezone(&Utc).hour(), 12);
    }
}
