//! SQLite-backed schedule interning.
//!
//! Every time of day, interval and merged schedule is a row in one
//! `schedules` table keyed by its `(minute, hour, day_of_month)` triple.
//! Identical triples always resolve to the same row.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::{
    CompositeSchedule, CronField, Crontab, IntervalUnit, RecurrenceInterval, ScheduleError,
    ScheduleId, TimeOfDay,
};

/// Create the `schedules` table if it does not exist.
pub fn migrate(conn: &Connection) -> Result<(), ScheduleError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            minute TEXT NOT NULL,
            hour TEXT NOT NULL,
            day_of_month TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (minute, hour, day_of_month)
        );
        ",
    )?;
    Ok(())
}

/// Get-or-create access to the `schedules` table.
///
/// Borrows a connection so it can run inside a caller's transaction
/// (`rusqlite::Transaction` derefs to `Connection`).
pub struct ScheduleStore<'c> {
    conn: &'c Connection,
}

impl<'c> ScheduleStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Return the id of the row holding `crontab`, inserting it if needed.
    ///
    /// The insert is a no-op on conflict with the unique triple, so two
    /// callers racing on the same schedule both read back the same row.
    pub fn get_or_create(&self, crontab: Crontab) -> Result<ScheduleId, ScheduleError> {
        let (minute, hour, day) = (
            crontab.minute.to_string(),
            crontab.hour.to_string(),
            crontab.day_of_month.to_string(),
        );

        let inserted = self.conn.execute(
            "INSERT INTO schedules (minute, hour, day_of_month) VALUES (?1, ?2, ?3)
             ON CONFLICT (minute, hour, day_of_month) DO NOTHING",
            params![minute, hour, day],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM schedules WHERE minute = ?1 AND hour = ?2 AND day_of_month = ?3",
            params![minute, hour, day],
            |row| row.get(0),
        )?;

        debug!(id, crontab = %crontab, created = inserted > 0, "resolved schedule");
        Ok(ScheduleId(id))
    }

    /// Load the crontab stored under `id`.
    pub fn get(&self, id: ScheduleId) -> Result<Option<Crontab>, ScheduleError> {
        let row = self
            .conn
            .query_row(
                "SELECT minute, hour, day_of_month FROM schedules WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(minute, hour, day)| -> Result<Crontab, ScheduleError> {
            Ok(Crontab::new(minute.parse()?, hour.parse()?, day.parse()?))
        })
        .transpose()
    }

    fn require(&self, id: ScheduleId) -> Result<Crontab, ScheduleError> {
        self.get(id)?.ok_or(ScheduleError::NotFound(id))
    }

    /// Intern a validated clock time.
    pub fn get_or_create_time_of_day(
        &self,
        hour: u8,
        minute: u8,
    ) -> Result<TimeOfDay, ScheduleError> {
        let crontab = Crontab::new(CronField::Value(minute), CronField::Value(hour), CronField::Any);
        let id = self.get_or_create(crontab)?;
        Ok(TimeOfDay { id, hour, minute })
    }

    /// Intern a validated interval.
    pub fn get_or_create_interval(
        &self,
        unit: IntervalUnit,
        every: u8,
    ) -> Result<RecurrenceInterval, ScheduleError> {
        let mut interval = RecurrenceInterval {
            id: ScheduleId(0),
            unit,
            every,
        };
        interval.id = self.get_or_create(interval.crontab())?;
        Ok(interval)
    }

    /// Intern a merged schedule.
    pub fn get_or_create_composite(
        &self,
        crontab: Crontab,
    ) -> Result<CompositeSchedule, ScheduleError> {
        let id = self.get_or_create(crontab)?;
        Ok(CompositeSchedule { id, crontab })
    }

    pub fn time_of_day(&self, id: ScheduleId) -> Result<TimeOfDay, ScheduleError> {
        TimeOfDay::from_crontab(id, self.require(id)?)
    }

    pub fn interval(&self, id: ScheduleId) -> Result<RecurrenceInterval, ScheduleError> {
        RecurrenceInterval::from_crontab(id, self.require(id)?)
    }

    pub fn composite(&self, id: ScheduleId) -> Result<CompositeSchedule, ScheduleError> {
        Ok(CompositeSchedule {
            id,
            crontab: self.require(id)?,
        })
    }

    /// Number of stored schedules.
    pub fn count(&self) -> Result<usize, ScheduleError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM schedules", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_time_of_day_is_interned() {
        let conn = conn();
        let store = ScheduleStore::new(&conn);

        let first = store.get_or_create_time_of_day(18, 30).unwrap();
        let second = store.get_or_create_time_of_day(18, 30).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_distinct_triples_get_distinct_rows() {
        let conn = conn();
        let store = ScheduleStore::new(&conn);

        let time = store.get_or_create_time_of_day(18, 30).unwrap();
        let other = store.get_or_create_time_of_day(18, 31).unwrap();
        let interval = store.get_or_create_interval(IntervalUnit::Day, 2).unwrap();

        assert_ne!(time.id, other.id);
        assert_ne!(time.id, interval.id);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_interval_is_interned() {
        let conn = conn();
        let store = ScheduleStore::new(&conn);

        let first = store.get_or_create_interval(IntervalUnit::Minute, 30).unwrap();
        let second = store.get_or_create_interval(IntervalUnit::Minute, 30).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.interval(first.id).unwrap(), first);
    }

    #[test]
    fn test_loaders_check_shape() {
        let conn = conn();
        let store = ScheduleStore::new(&conn);

        let time = store.get_or_create_time_of_day(9, 0).unwrap();
        assert_eq!(store.time_of_day(time.id).unwrap(), time);
        assert!(matches!(
            store.interval(time.id),
            Err(ScheduleError::UnexpectedShape { .. })
        ));
        assert!(matches!(
            store.time_of_day(ScheduleId(999)),
            Err(ScheduleError::NotFound(ScheduleId(999)))
        ));
    }

    #[test]
    fn test_interning_inside_transaction() {
        let mut conn = conn();
        let tx = conn.transaction().unwrap();
        let id = ScheduleStore::new(&tx)
            .get_or_create_time_of_day(6, 15)
            .unwrap()
            .id;
        tx.commit().unwrap();

        let store = ScheduleStore::new(&conn);
        assert_eq!(store.get_or_create_time_of_day(6, 15).unwrap().id, id);
    }

    #[test]
    fn test_rolled_back_schedule_is_not_kept() {
        let mut conn = conn();
        {
            let tx = conn.transaction().unwrap();
            ScheduleStore::new(&tx)
                .get_or_create_time_of_day(6, 15)
                .unwrap();
            // dropped without commit
        }
        assert_eq!(ScheduleStore::new(&conn).count().unwrap(), 0);
    }
}
