//! One-shot commands against the habit database.

use std::sync::Arc;

use habitual_reminders::{
    BindOutcome, HabitDb, HabitDraft, HabitId, HabitService, OwnerId, ReminderConfig,
};
use habitual_schedule::{
    DEFAULT_INTERVAL, Language, RecurrenceInterval, ScheduleId, TimeOfDay, describe,
    merge_crontab, parse_interval, validate_time_of_day,
};
use miette::{IntoDiagnostic, Result};

pub fn open_service(db: &str, config: ReminderConfig) -> Result<HabitService> {
    let db = HabitDb::open(db).into_diagnostic()?;
    Ok(HabitService::new(Arc::new(db), config))
}

/// Print the merged crontab for a time and interval without touching storage.
pub fn preview(time: &str, interval: Option<&str>, language: Language) -> Result<()> {
    let (hour, minute) = validate_time_of_day(time).into_diagnostic()?;
    let (unit, every) = match interval {
        Some(raw) => parse_interval(Some(raw)).into_diagnostic()?,
        None => DEFAULT_INTERVAL,
    };

    let time_of_day = TimeOfDay {
        id: ScheduleId(0),
        hour,
        minute,
    };
    let interval = RecurrenceInterval {
        id: ScheduleId(0),
        unit,
        every,
    };
    let merged = merge_crontab(&time_of_day.crontab(), &interval.crontab());

    println!("{merged}");
    println!("{}", describe(&merged, language));
    Ok(())
}

pub fn add_owner(db: &str, config: ReminderConfig, username: &str, phone: &str) -> Result<()> {
    let owner = open_service(db, config)?
        .add_owner(username, phone)
        .into_diagnostic()?;
    print_json(&owner)
}

pub fn create_habit(
    db: &str,
    config: ReminderConfig,
    owner: OwnerId,
    draft: HabitDraft,
) -> Result<()> {
    let habit = open_service(db, config)?
        .create_habit(owner, draft)
        .into_diagnostic()?;
    print_json(&habit)
}

pub fn update_habit(db: &str, config: ReminderConfig, id: HabitId, draft: HabitDraft) -> Result<()> {
    let habit = open_service(db, config)?
        .update_habit(id, draft)
        .into_diagnostic()?;
    print_json(&habit)
}

pub fn delete_habit(db: &str, config: ReminderConfig, id: HabitId) -> Result<()> {
    open_service(db, config)?.delete_habit(id).into_diagnostic()?;
    println!("deleted habit {id}");
    Ok(())
}

pub fn list_habits(db: &str, config: ReminderConfig, owner: OwnerId) -> Result<()> {
    let service = open_service(db, config)?;
    let next = service
        .next_habit(owner, &config.now())
        .into_diagnostic()?
        .map(|h| h.id);

    for habit in service.habits_for(owner).into_diagnostic()? {
        let marker = if Some(habit.id) == next { "*" } else { " " };
        println!(
            "{marker} {:>4}  {:>5}  {:<16} {} at {}",
            habit.id,
            habit.time_to_do.to_string(),
            describe(&habit.interval.crontab(), Language::English),
            habit.action,
            habit.place,
        );
    }
    Ok(())
}

pub fn bind_chat(db: &str, config: ReminderConfig, phone: &str, chat_id: i64) -> Result<()> {
    match open_service(db, config)?
        .bind_chat(phone, chat_id)
        .into_diagnostic()?
    {
        BindOutcome::AlreadyBound { owner, chat_id } => {
            println!("owner {owner} is already bound to chat {chat_id}");
        }
        BindOutcome::Bound {
            owner,
            enabled_jobs,
            useful_habits,
            nice_habits,
        } => {
            println!(
                "bound owner {owner}: {useful_habits} useful and {nice_habits} nice habits, \
                 {enabled_jobs} reminders enabled"
            );
        }
    }
    Ok(())
}

pub fn list_jobs(db: &str, config: ReminderConfig) -> Result<()> {
    for job in open_service(db, config)?.jobs().into_diagnostic()? {
        println!(
            "{:<28} {:<16} {}  start={} rev={}",
            job.name,
            job.schedule.crontab.to_string(),
            if job.enabled { "enabled " } else { "disabled" },
            job.start_time.to_rfc3339(),
            job.revision,
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}
