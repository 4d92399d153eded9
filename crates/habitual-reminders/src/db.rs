//! SQLite database holding owners, habits, schedules and reminder jobs.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use crate::ReminderError;

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed habit database.
pub struct HabitDb {
    conn: Mutex<Connection>,
}

impl HabitDb {
    /// Open or create the SQLite database.
    pub fn open(path: &str) -> Result<Self, ReminderError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self::init(conn)?;
        info!(path = %path, "habit database initialized");
        Ok(db)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, ReminderError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ReminderError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        habitual_schedule::migrate(&conn)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS owners (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                phone TEXT NOT NULL UNIQUE,
                chat_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS habits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
                place TEXT NOT NULL,
                action TEXT NOT NULL,
                time_to_do INTEGER NOT NULL REFERENCES schedules(id),
                interval INTEGER NOT NULL REFERENCES schedules(id),
                time_to_done_secs INTEGER NOT NULL,
                is_nice_habit INTEGER NOT NULL,
                related_habit INTEGER REFERENCES habits(id) ON DELETE SET NULL,
                reward TEXT,
                is_published INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_habits_owner ON habits(owner_id);
            CREATE INDEX IF NOT EXISTS idx_habits_related ON habits(related_habit);

            CREATE TABLE IF NOT EXISTS reminder_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                task TEXT NOT NULL,
                schedule_id INTEGER NOT NULL REFERENCES schedules(id),
                start_time TEXT NOT NULL,
                enabled INTEGER NOT NULL,
                expire_seconds INTEGER NOT NULL,
                args TEXT NOT NULL,
                last_run_at TEXT,
                revision INTEGER NOT NULL DEFAULT 1,
                changed_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection for a sequence of reads or single writes.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, ReminderError> {
        self.conn.lock().map_err(|_| ReminderError::Poisoned)
    }

    /// Run `f` inside one transaction, committing only if it succeeds.
    ///
    /// The write lock is taken when the transaction begins. A deferred
    /// transaction that reads first cannot upgrade once another connection
    /// has committed, and that failure skips the busy timeout.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, ReminderError>,
    ) -> Result<T, ReminderError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitual_schedule::ScheduleStore;

    #[test]
    fn test_open_on_disk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habits.db");
        let path = path.to_str().unwrap();

        HabitDb::open(path).unwrap();
        // Reopening runs the schema again without error
        let db = HabitDb::open(path).unwrap();
        let conn = db.lock().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('schedules', 'owners', 'habits', 'reminder_jobs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = HabitDb::open_in_memory().unwrap();
        let result: Result<(), ReminderError> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO owners (username, phone) VALUES ('a', '+1')",
                [],
            )?;
            Err(ReminderError::Poisoned)
        });
        assert!(result.is_err());

        let conn = db.lock().unwrap();
        let owners: i64 = conn
            .query_row("SELECT COUNT(*) FROM owners", [], |row| row.get(0))
            .unwrap();
        assert_eq!(owners, 0);
    }

    #[test]
    fn test_concurrent_writers_share_interned_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habits.db");
        let path = path.to_str().unwrap();
        let first = HabitDb::open(path).unwrap();
        let second = HabitDb::open(path).unwrap();

        let (first_id, second_id) = std::thread::scope(|scope| {
            let first_id = first
                .transaction(|tx| {
                    let store = ScheduleStore::new(tx);
                    store.count()?;

                    // The other writer starts while this transaction is open
                    let other = scope.spawn(|| {
                        second.transaction(|tx| {
                            Ok(ScheduleStore::new(tx).get_or_create_time_of_day(6, 15)?)
                        })
                    });
                    std::thread::sleep(Duration::from_millis(100));

                    let time = store.get_or_create_time_of_day(6, 15)?;
                    Ok((time.id, other))
                })
                .unwrap();
            let (first_id, other) = first_id;
            let second_id = other.join().unwrap().unwrap().id;
            (first_id, second_id)
        });

        assert_eq!(first_id, second_id);
        let conn = first.lock().unwrap();
        assert_eq!(ScheduleStore::new(&conn).count().unwrap(), 1);
    }
}
