//! Owner and habit rows.

use habitual_schedule::{ScheduleId, ScheduleStore};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{Habit, HabitId, Owner, OwnerId, ReminderError};

const HABIT_COLUMNS: &str = "id, owner_id, place, action, time_to_do, interval, time_to_done_secs,
     is_nice_habit, related_habit, reward, is_published";

/// A habit row before its schedule ids are resolved.
struct HabitRow {
    id: i64,
    owner_id: i64,
    place: String,
    action: String,
    time_to_do: i64,
    interval: i64,
    time_to_done_secs: u32,
    is_nice_habit: bool,
    related_habit: Option<i64>,
    reward: Option<String>,
    is_published: bool,
}

impl HabitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            place: row.get(2)?,
            action: row.get(3)?,
            time_to_do: row.get(4)?,
            interval: row.get(5)?,
            time_to_done_secs: row.get(6)?,
            is_nice_habit: row.get(7)?,
            related_habit: row.get(8)?,
            reward: row.get(9)?,
            is_published: row.get(10)?,
        })
    }
}

/// Access to the `owners` and `habits` tables on one connection.
pub struct HabitRepo<'c> {
    conn: &'c Connection,
}

impl<'c> HabitRepo<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // =========================================================================
    // Owners
    // =========================================================================

    pub fn insert_owner(&self, username: &str, phone: &str) -> Result<Owner, ReminderError> {
        self.conn.execute(
            "INSERT INTO owners (username, phone) VALUES (?1, ?2)",
            params![username, phone],
        )?;
        Ok(Owner {
            id: OwnerId(self.conn.last_insert_rowid()),
            username: username.to_string(),
            phone: phone.to_string(),
            chat_id: None,
        })
    }

    pub fn owner(&self, id: OwnerId) -> Result<Option<Owner>, ReminderError> {
        self.query_owner("WHERE id = ?1", params![id.0])
    }

    pub fn owner_by_phone(&self, phone: &str) -> Result<Option<Owner>, ReminderError> {
        self.query_owner("WHERE phone = ?1", params![phone])
    }

    fn query_owner(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Option<Owner>, ReminderError> {
        let sql = format!("SELECT id, username, phone, chat_id FROM owners {filter}");
        let owner = self
            .conn
            .query_row(&sql, params, |row| {
                Ok(Owner {
                    id: OwnerId(row.get(0)?),
                    username: row.get(1)?,
                    phone: row.get(2)?,
                    chat_id: row.get(3)?,
                })
            })
            .optional()?;
        Ok(owner)
    }

    pub fn set_chat_id(&self, owner: OwnerId, chat_id: i64) -> Result<(), ReminderError> {
        self.conn.execute(
            "UPDATE owners SET chat_id = ?2 WHERE id = ?1",
            params![owner.0, chat_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Habits
    // =========================================================================

    /// Insert a habit; the `id` field of `habit` is ignored and the new one returned.
    pub fn insert_habit(&self, habit: &Habit) -> Result<HabitId, ReminderError> {
        self.conn.execute(
            "INSERT INTO habits
             (owner_id, place, action, time_to_do, interval, time_to_done_secs,
              is_nice_habit, related_habit, reward, is_published)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                habit.owner_id.0,
                habit.place,
                habit.action,
                habit.time_to_do.id.0,
                habit.interval.id.0,
                habit.time_to_done_secs,
                habit.is_nice_habit,
                habit.related_habit.map(|h| h.0),
                habit.reward,
                habit.is_published,
            ],
        )?;
        Ok(HabitId(self.conn.last_insert_rowid()))
    }

    /// Overwrite every column of an existing habit.
    pub fn save_habit(&self, habit: &Habit) -> Result<(), ReminderError> {
        let updated = self.conn.execute(
            "UPDATE habits SET
                place = ?2, action = ?3, time_to_do = ?4, interval = ?5,
                time_to_done_secs = ?6, is_nice_habit = ?7, related_habit = ?8,
                reward = ?9, is_published = ?10
             WHERE id = ?1",
            params![
                habit.id.0,
                habit.place,
                habit.action,
                habit.time_to_do.id.0,
                habit.interval.id.0,
                habit.time_to_done_secs,
                habit.is_nice_habit,
                habit.related_habit.map(|h| h.0),
                habit.reward,
                habit.is_published,
            ],
        )?;
        if updated == 0 {
            return Err(ReminderError::HabitNotFound(habit.id));
        }
        Ok(())
    }

    pub fn delete_habit(&self, id: HabitId) -> Result<bool, ReminderError> {
        let deleted = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id.0])?;
        Ok(deleted > 0)
    }

    pub fn habit(&self, id: HabitId) -> Result<Option<Habit>, ReminderError> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id.0], HabitRow::from_row)
            .optional()?;
        row.map(|row| self.resolve(row)).transpose()
    }

    /// All habits of an owner, earliest time of day first, ties by id.
    ///
    /// Schedule fields are stored as crontab text, so the ordering happens
    /// after the time of day is resolved.
    pub fn habits_for(&self, owner: OwnerId) -> Result<Vec<Habit>, ReminderError> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE owner_id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner.0], HabitRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut habits = rows
            .into_iter()
            .map(|row| self.resolve(row))
            .collect::<Result<Vec<_>, _>>()?;
        habits.sort_by_key(|h| (h.time_to_do.hour, h.time_to_do.minute, h.id));
        Ok(habits)
    }

    /// Number of an owner's nice or useful habits.
    pub fn count_for(&self, owner: OwnerId, is_nice_habit: bool) -> Result<usize, ReminderError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM habits WHERE owner_id = ?1 AND is_nice_habit = ?2",
            params![owner.0, is_nice_habit],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Set the publicity of one habit and every habit pointing at it.
    ///
    /// Returns the number of rows changed.
    pub fn publish_chain(&self, root: HabitId, is_published: bool) -> Result<usize, ReminderError> {
        let changed = self.conn.execute(
            "UPDATE habits SET is_published = ?2 WHERE id = ?1 OR related_habit = ?1",
            params![root.0, is_published],
        )?;
        Ok(changed)
    }

    fn resolve(&self, row: HabitRow) -> Result<Habit, ReminderError> {
        let store = ScheduleStore::new(self.conn);
        Ok(Habit {
            id: HabitId(row.id),
            owner_id: OwnerId(row.owner_id),
            place: row.place,
            action: row.action,
            time_to_do: store.time_of_day(ScheduleId(row.time_to_do))?,
            interval: store.interval(ScheduleId(row.interval))?,
            time_to_done_secs: row.time_to_done_secs,
            is_nice_habit: row.is_nice_habit,
            related_habit: row.related_habit.map(HabitId),
            reward: row.reward,
            is_published: row.is_published,
        })
    }
}
