//! Reminder dispatcher.
//!
//! Wakes at every minute boundary, picks the enabled jobs whose schedule
//! matches the local minute, and hands them to an executor.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{HabitDb, JobRepo, ReminderConfig, ReminderError, ReminderJob};

/// Minimum sleep between ticks.
const MIN_SLEEP_SECS: u64 = 1;

/// Type alias for the reminder executor function.
pub type ReminderExecutor = Box<
    dyn Fn(ReminderJob) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>> + Send + Sync,
>;

/// Runs due reminder jobs.
pub struct Dispatcher {
    db: Arc<HabitDb>,
    config: ReminderConfig,
}

impl Dispatcher {
    pub fn new(db: Arc<HabitDb>, config: ReminderConfig) -> Self {
        Self { db, config }
    }

    /// Jobs due at `now`, without marking them.
    pub fn due_jobs(&self, now: &DateTime<FixedOffset>) -> Result<Vec<ReminderJob>, ReminderError> {
        let conn = self.db.lock()?;
        Ok(JobRepo::new(&conn)
            .enabled()?
            .into_iter()
            .filter(|job| job.is_due(now))
            .collect())
    }

    /// Run every job due at `now`. Returns how many jobs were started.
    ///
    /// Each job is marked as run before the executor is invoked, so a failing
    /// executor does not fire the same job twice within one minute.
    pub async fn tick(
        &self,
        now: DateTime<FixedOffset>,
        executor: &ReminderExecutor,
    ) -> Result<usize, ReminderError> {
        let due = self.due_jobs(&now)?;
        let started = due.len();

        for job in due {
            {
                let conn = self.db.lock()?;
                JobRepo::new(&conn).mark_run(job.id, now.with_timezone(&Utc))?;
            }

            info!(job = %job.name, habit_id = %job.args.habit_id, "dispatching reminder");
            let name = job.name.clone();
            if let Err(error) = executor(job).await {
                warn!(job = %name, error = %error, "reminder delivery failed");
            }
        }

        Ok(started)
    }

    /// Run the dispatcher loop until `shutdown_rx` turns true.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>, executor: ReminderExecutor) {
        info!(utc_offset = %self.config.utc_offset, "dispatcher starting");

        loop {
            if *shutdown_rx.borrow() {
                info!("dispatcher shutting down");
                break;
            }

            let now = self.config.now();
            match self.tick(now, &executor).await {
                Ok(0) => debug!(at = %now, "no reminders due"),
                Ok(started) => debug!(at = %now, started, "dispatched reminders"),
                Err(error) => warn!(error = %error, "dispatcher tick failed"),
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("dispatcher received shutdown signal");
                    }
                }
                _ = sleep(until_next_minute(&self.config.now())) => {}
            }
        }

        info!("dispatcher shut down gracefully");
    }
}

/// Time left until the next minute boundary.
fn until_next_minute(now: &DateTime<FixedOffset>) -> Duration {
    let secs = 60 - u64::from(now.second());
    Duration::from_secs(secs.max(MIN_SLEEP_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_until_next_minute() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let at = |s| offset.with_ymd_and_hms(2024, 1, 1, 10, 0, s).unwrap();
        assert_eq!(until_next_minute(&at(0)), Duration::from_secs(60));
        assert_eq!(until_next_minute(&at(45)), Duration::from_secs(15));
        assert_eq!(until_next_minute(&at(59)), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dispatcher = Dispatcher::new(
            Arc::new(HabitDb::open_in_memory().unwrap()),
            ReminderConfig::default(),
        );
        let (tx, rx) = watch::channel(true);
        let executor: ReminderExecutor = Box::new(|_| Box::pin(async { Ok(()) }));

        dispatcher.run(rx, executor).await;
        drop(tx);
    }
}
