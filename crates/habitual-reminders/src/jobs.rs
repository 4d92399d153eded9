//! Reminder job rows.
//!
//! Jobs are looked up by name pattern: `_<habit>/` picks out one habit's job
//! and a `/U-<owner>` suffix picks out every job of an owner.

use chrono::{DateTime, Utc};
use habitual_schedule::{ScheduleId, ScheduleStore};
use rusqlite::{Connection, Row, params};

use crate::{HabitId, OwnerId, ReminderArgs, ReminderError, ReminderJob};

const JOB_COLUMNS: &str = "id, name, task, schedule_id, start_time, enabled, expire_seconds,
     args, last_run_at, revision, changed_at";

struct JobRow {
    id: i64,
    name: String,
    task: String,
    schedule_id: i64,
    start_time: String,
    enabled: bool,
    expire_seconds: i64,
    args: String,
    last_run_at: Option<String>,
    revision: u32,
    changed_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            task: row.get(2)?,
            schedule_id: row.get(3)?,
            start_time: row.get(4)?,
            enabled: row.get(5)?,
            expire_seconds: row.get(6)?,
            args: row.get(7)?,
            last_run_at: row.get(8)?,
            revision: row.get(9)?,
            changed_at: row.get(10)?,
        })
    }
}

fn parse_time(raw: &str) -> Result<DateTime<chrono::FixedOffset>, ReminderError> {
    DateTime::parse_from_rfc3339(raw).map_err(|_| ReminderError::InvalidTimestamp(raw.to_string()))
}

/// `LIKE` pattern matching the job of one habit.
fn habit_pattern(habit: HabitId) -> String {
    format!("%\\_{habit}/%")
}

/// `LIKE` pattern matching every job of one owner.
fn owner_pattern(owner: OwnerId) -> String {
    format!("%/U-{owner}")
}

/// Access to the `reminder_jobs` table on one connection.
pub struct JobRepo<'c> {
    conn: &'c Connection,
}

impl<'c> JobRepo<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a job; the `id` and `revision` of `job` are ignored.
    pub fn insert(&self, job: &ReminderJob) -> Result<ReminderJob, ReminderError> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO reminder_jobs
             (name, task, schedule_id, start_time, enabled, expire_seconds, args, revision, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
            params![
                job.name,
                job.task,
                job.schedule.id.0,
                job.start_time.to_rfc3339(),
                job.enabled,
                i64::try_from(job.expire_seconds).unwrap_or(i64::MAX),
                serde_json::to_string(&job.args)?,
                now.to_rfc3339(),
            ],
        )?;

        Ok(ReminderJob {
            id: self.conn.last_insert_rowid(),
            revision: 1,
            changed_at: now,
            ..job.clone()
        })
    }

    /// Write the schedule, start time, enabled flag and arguments of `job`,
    /// bumping its revision.
    pub fn save(&self, job: &mut ReminderJob) -> Result<(), ReminderError> {
        let now = Utc::now();
        self.conn.execute(
            "UPDATE reminder_jobs SET
                schedule_id = ?2, start_time = ?3, enabled = ?4, args = ?5,
                revision = revision + 1, changed_at = ?6
             WHERE id = ?1",
            params![
                job.id,
                job.schedule.id.0,
                job.start_time.to_rfc3339(),
                job.enabled,
                serde_json::to_string(&job.args)?,
                now.to_rfc3339(),
            ],
        )?;
        job.revision += 1;
        job.changed_at = now;
        Ok(())
    }

    pub fn mark_run(&self, id: i64, at: DateTime<Utc>) -> Result<(), ReminderError> {
        self.conn.execute(
            "UPDATE reminder_jobs SET last_run_at = ?2 WHERE id = ?1",
            params![id, at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn by_name(&self, name: &str) -> Result<Option<ReminderJob>, ReminderError> {
        Ok(self.query("WHERE name = ?1", params![name])?.into_iter().next())
    }

    /// The job bound to `habit`, if any.
    pub fn for_habit(&self, habit: HabitId) -> Result<Option<ReminderJob>, ReminderError> {
        Ok(self
            .query("WHERE name LIKE ?1 ESCAPE '\\'", params![habit_pattern(habit)])?
            .into_iter()
            .next())
    }

    pub fn for_owner(&self, owner: OwnerId) -> Result<Vec<ReminderJob>, ReminderError> {
        self.query("WHERE name LIKE ?1", params![owner_pattern(owner)])
    }

    pub fn all(&self) -> Result<Vec<ReminderJob>, ReminderError> {
        self.query("", params![])
    }

    pub fn enabled(&self) -> Result<Vec<ReminderJob>, ReminderError> {
        self.query("WHERE enabled = 1", params![])
    }

    /// Delete every job bound to `habit`.
    pub fn delete_for_habit(&self, habit: HabitId) -> Result<usize, ReminderError> {
        let deleted = self.conn.execute(
            "DELETE FROM reminder_jobs WHERE name LIKE ?1 ESCAPE '\\'",
            params![habit_pattern(habit)],
        )?;
        Ok(deleted)
    }

    fn query(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ReminderJob>, ReminderError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM reminder_jobs {filter} ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params, JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| self.resolve(row)).collect()
    }

    fn resolve(&self, row: JobRow) -> Result<ReminderJob, ReminderError> {
        let schedule = ScheduleStore::new(self.conn).composite(ScheduleId(row.schedule_id))?;
        let last_run_at = row
            .last_run_at
            .as_deref()
            .map(parse_time)
            .transpose()?
            .map(|t| t.with_timezone(&Utc));

        Ok(ReminderJob {
            id: row.id,
            name: row.name,
            task: row.task,
            schedule,
            start_time: parse_time(&row.start_time)?,
            enabled: row.enabled,
            expire_seconds: u64::try_from(row.expire_seconds).unwrap_or_default(),
            args: serde_json::from_str::<ReminderArgs>(&row.args)?,
            last_run_at,
            revision: row.revision,
            changed_at: parse_time(&row.changed_at)?.with_timezone(&Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_habit_pattern_is_delimited() {
        assert_eq!(habit_pattern(HabitId(1)), "%\\_1/%");
        assert_eq!(owner_pattern(OwnerId(3)), "%/U-3");
    }
}
