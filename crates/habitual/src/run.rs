//! Run command: dispatch due reminders until interrupted.

use std::sync::Arc;

use habitual_reminders::{Dispatcher, HabitDb, ReminderConfig, ReminderExecutor};
use miette::{IntoDiagnostic, Result};
use tokio::sync::watch;
use tracing::info;

/// Executor that only logs each reminder.
fn log_executor(expire_seconds: u64) -> ReminderExecutor {
    Box::new(move |job| {
        Box::pin(async move {
            info!(
                job = %job.name,
                task = %job.task,
                habit_id = %job.args.habit_id,
                chat_id = ?job.args.chat_id,
                expire_seconds,
                "reminder due"
            );
            Ok(())
        })
    })
}

pub async fn run(db: &str, config: ReminderConfig) -> Result<()> {
    let db = Arc::new(HabitDb::open(db).into_diagnostic()?);
    let dispatcher = Dispatcher::new(db, config);

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown signals
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    dispatcher
        .run(shutdown_rx, log_executor(config.expire_seconds))
        .await;
    Ok(())
}
