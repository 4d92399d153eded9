//! Habit service.
//!
//! Every operation runs inside one transaction: the habit rows, the interned
//! schedules and the reminder job either all change or none do.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Timelike};
use habitual_schedule::{
    DEFAULT_INTERVAL, RecurrenceInterval, ScheduleStore, TimeOfDay, parse_interval,
    validate_duration, validate_time_of_day,
};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::{
    DraftContext, Field, FieldError, Habit, HabitDb, HabitDraft, HabitId, HabitRepo, JobRepo,
    Owner, OwnerId, ReminderBinding, ReminderConfig, ReminderError, ReminderJob,
    ValidationErrors, validate_draft,
};

/// Result of binding a chat to an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The owner already had a chat; nothing changed.
    AlreadyBound { owner: OwnerId, chat_id: i64 },
    /// The chat was recorded and the owner's disabled jobs were enabled.
    Bound {
        owner: OwnerId,
        enabled_jobs: usize,
        useful_habits: usize,
        nice_habits: usize,
    },
}

/// Habit operations over one database.
pub struct HabitService {
    db: Arc<HabitDb>,
    config: ReminderConfig,
}

impl HabitService {
    pub fn new(db: Arc<HabitDb>, config: ReminderConfig) -> Self {
        Self { db, config }
    }

    /// The shared database, e.g. for a [`Dispatcher`](crate::Dispatcher).
    pub fn db(&self) -> &Arc<HabitDb> {
        &self.db
    }

    pub fn config(&self) -> ReminderConfig {
        self.config
    }

    #[tracing::instrument(skip(self))]
    pub fn add_owner(&self, username: &str, phone: &str) -> Result<Owner, ReminderError> {
        let owner = self
            .db
            .transaction(|tx| HabitRepo::new(tx).insert_owner(username, phone))?;
        info!(owner_id = %owner.id, "added owner");
        Ok(owner)
    }

    /// Validate a draft, store the habit and create its reminder job.
    #[tracing::instrument(skip(self, draft))]
    pub fn create_habit(&self, owner: OwnerId, draft: HabitDraft) -> Result<Habit, ReminderError> {
        self.db.transaction(|tx| {
            let habits = HabitRepo::new(tx);
            let owner = habits
                .owner(owner)?
                .ok_or(ReminderError::OwnerNotFound(owner))?;

            let related = lookup_related(&habits, &draft)?;
            let mut errors = missing_fields(&draft);
            if let Err(failed) = validate_draft(&DraftContext {
                draft: &draft,
                related: related.as_ref(),
                current: None,
            }) {
                failed.errors().iter().cloned().for_each(|e| errors.push(e));
            }
            if !errors.is_empty() {
                return Err(errors.into());
            }

            let time_to_do = resolve_time_of_day(tx, draft.time_to_do.as_deref().unwrap_or_default())?;
            let interval = resolve_interval(tx, draft.interval.as_deref())?;
            let mut habit = Habit {
                id: HabitId(0),
                owner_id: owner.id,
                place: draft.place.unwrap_or_default(),
                action: draft.action.unwrap_or_default(),
                time_to_do,
                interval,
                time_to_done_secs: duration_secs(draft.time_to_done.as_deref().unwrap_or_default())?,
                is_nice_habit: draft.is_nice_habit.unwrap_or_default(),
                related_habit: draft.related_habit,
                reward: draft.reward.and_then(non_empty),
                is_published: draft.is_published.unwrap_or_default(),
            };
            habit.id = habits.insert_habit(&habit)?;

            ReminderBinding::new(tx, self.config).create(
                &habit,
                &habit.time_to_do,
                &habit.interval,
                owner.chat_id,
            )?;
            info!(habit_id = %habit.id, owner_id = %owner.id, "created habit");
            Ok(habit)
        })
    }

    /// Apply a partial draft to a habit and refresh its reminder job.
    ///
    /// Fields missing from the draft keep their stored values; an empty
    /// `reward` clears the reward.
    ///
    /// A publicity change spreads along the related-habit chain: to the
    /// related habit and every habit sharing it, or to every habit pointing at
    /// this one when it has no related habit.
    #[tracing::instrument(skip(self, draft))]
    pub fn update_habit(&self, id: HabitId, draft: HabitDraft) -> Result<Habit, ReminderError> {
        self.db.transaction(|tx| {
            let habits = HabitRepo::new(tx);
            let current = habits.habit(id)?.ok_or(ReminderError::HabitNotFound(id))?;
            let related = lookup_related(&habits, &draft)?;
            validate_draft(&DraftContext {
                draft: &draft,
                related: related.as_ref(),
                current: Some(&current),
            })?;

            let new_time = draft
                .time_to_do
                .as_deref()
                .map(|raw| resolve_time_of_day(tx, raw))
                .transpose()?;
            let new_interval = draft
                .interval
                .as_deref()
                .map(|raw| resolve_interval(tx, Some(raw)))
                .transpose()?;
            let time_to_done_secs = match draft.time_to_done.as_deref() {
                Some(raw) => duration_secs(raw)?,
                None => current.time_to_done_secs,
            };

            let habit = Habit {
                id,
                owner_id: current.owner_id,
                place: draft.place.unwrap_or(current.place),
                action: draft.action.unwrap_or(current.action),
                time_to_do: new_time.unwrap_or(current.time_to_do),
                interval: new_interval.unwrap_or(current.interval),
                time_to_done_secs,
                is_nice_habit: draft.is_nice_habit.unwrap_or(current.is_nice_habit),
                related_habit: draft.related_habit.or(current.related_habit),
                reward: match draft.reward {
                    Some(reward) => non_empty(reward),
                    None => current.reward,
                },
                is_published: draft.is_published.unwrap_or(current.is_published),
            };
            habits.save_habit(&habit)?;

            if let Some(is_published) = draft.is_published {
                let root = habit.related_habit.unwrap_or(habit.id);
                let changed = habits.publish_chain(root, is_published)?;
                info!(root = %root, is_published, changed, "propagated publicity");
            }

            ReminderBinding::new(tx, self.config).update(
                &habit,
                new_time.as_ref(),
                new_interval.as_ref(),
            )?;
            info!(habit_id = %habit.id, "updated habit");
            Ok(habit)
        })
    }

    /// Delete a habit together with its reminder job.
    #[tracing::instrument(skip(self))]
    pub fn delete_habit(&self, id: HabitId) -> Result<(), ReminderError> {
        self.db.transaction(|tx| {
            ReminderBinding::new(tx, self.config).delete(id)?;
            if !HabitRepo::new(tx).delete_habit(id)? {
                return Err(ReminderError::HabitNotFound(id));
            }
            info!(habit_id = %id, "deleted habit");
            Ok(())
        })
    }

    /// Record the chat an owner reached us from, matched by phone number,
    /// and enable their pending reminders.
    #[tracing::instrument(skip(self))]
    pub fn bind_chat(&self, phone: &str, chat_id: i64) -> Result<BindOutcome, ReminderError> {
        self.db.transaction(|tx| {
            let habits = HabitRepo::new(tx);
            let owner = habits
                .owner_by_phone(phone)?
                .ok_or_else(|| ReminderError::PhoneNotFound(phone.to_string()))?;

            if let Some(existing) = owner.chat_id {
                warn!(owner_id = %owner.id, "owner already bound to a chat");
                return Ok(BindOutcome::AlreadyBound {
                    owner: owner.id,
                    chat_id: existing,
                });
            }

            habits.set_chat_id(owner.id, chat_id)?;
            let enabled_jobs = ReminderBinding::new(tx, self.config).bind_chat(owner.id, chat_id)?;
            Ok(BindOutcome::Bound {
                owner: owner.id,
                enabled_jobs,
                useful_habits: habits.count_for(owner.id, false)?,
                nice_habits: habits.count_for(owner.id, true)?,
            })
        })
    }

    pub fn owner(&self, id: OwnerId) -> Result<Option<Owner>, ReminderError> {
        let conn = self.db.lock()?;
        HabitRepo::new(&conn).owner(id)
    }

    pub fn habit(&self, id: HabitId) -> Result<Option<Habit>, ReminderError> {
        let conn = self.db.lock()?;
        HabitRepo::new(&conn).habit(id)
    }

    /// Habits of an owner, earliest time of day first.
    pub fn habits_for(&self, owner: OwnerId) -> Result<Vec<Habit>, ReminderError> {
        let conn = self.db.lock()?;
        HabitRepo::new(&conn).habits_for(owner)
    }

    pub fn jobs(&self) -> Result<Vec<ReminderJob>, ReminderError> {
        let conn = self.db.lock()?;
        JobRepo::new(&conn).all()
    }

    pub fn job_for(&self, habit: HabitId) -> Result<Option<ReminderJob>, ReminderError> {
        let conn = self.db.lock()?;
        JobRepo::new(&conn).for_habit(habit)
    }

    /// The owner's first habit whose hour has not passed yet.
    pub fn next_habit(
        &self,
        owner: OwnerId,
        now: &DateTime<FixedOffset>,
    ) -> Result<Option<Habit>, ReminderError> {
        Ok(self
            .habits_for(owner)?
            .into_iter()
            .find(|h| u32::from(h.time_to_do.hour) >= now.hour()))
    }
}

/// An empty reward clears it.
fn non_empty(reward: String) -> Option<String> {
    (!reward.is_empty()).then_some(reward)
}

fn lookup_related(
    habits: &HabitRepo<'_>,
    draft: &HabitDraft,
) -> Result<Option<Habit>, ReminderError> {
    draft
        .related_habit
        .map(|id| habits.habit(id))
        .transpose()
        .map(Option::flatten)
}

/// Fields a new habit cannot be created without.
fn missing_fields(draft: &HabitDraft) -> ValidationErrors {
    let required = [
        ("place", draft.place.is_none()),
        ("action", draft.action.is_none()),
        ("time_to_do", draft.time_to_do.is_none()),
        ("time_to_done", draft.time_to_done.is_none()),
        ("is_nice_habit", draft.is_nice_habit.is_none()),
    ];

    let mut errors = ValidationErrors::default();
    for (name, missing) in required {
        if missing {
            errors.push(FieldError::new(Field::Error, format!("{name} is required")));
        }
    }
    errors
}

fn resolve_time_of_day(conn: &Connection, raw: &str) -> Result<TimeOfDay, ReminderError> {
    let (hour, minute) = validate_time_of_day(raw).map_err(habitual_schedule::ScheduleError::from)?;
    Ok(ScheduleStore::new(conn).get_or_create_time_of_day(hour, minute)?)
}

fn resolve_interval(
    conn: &Connection,
    raw: Option<&str>,
) -> Result<RecurrenceInterval, ReminderError> {
    let (unit, every) = match raw {
        Some(raw) => parse_interval(Some(raw)).map_err(habitual_schedule::ScheduleError::from)?,
        None => DEFAULT_INTERVAL,
    };
    Ok(ScheduleStore::new(conn).get_or_create_interval(unit, every)?)
}

fn duration_secs(raw: &str) -> Result<u32, ReminderError> {
    let duration = validate_duration(raw).map_err(habitual_schedule::ScheduleError::from)?;
    Ok(u32::try_from(duration.num_seconds()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn service() -> HabitService {
        HabitService::new(
            Arc::new(HabitDb::open_in_memory().unwrap()),
            ReminderConfig::default(),
        )
    }

    fn draft(time_to_do: &str) -> HabitDraft {
        HabitDraft {
            place: Some("home".to_string()),
            action: Some("stretch".to_string()),
            time_to_do: Some(time_to_do.to_string()),
            time_to_done: Some("1:30".to_string()),
            is_nice_habit: Some(false),
            ..HabitDraft::default()
        }
    }

    #[test]
    fn test_create_requires_fields() {
        let service = service();
        let owner = service.add_owner("ann", "+100").unwrap();

        let err = service
            .create_habit(owner.id, HabitDraft::default())
            .unwrap_err();
        let ReminderError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            errors.messages(Field::Error),
            vec![
                "place is required",
                "action is required",
                "time_to_do is required",
                "time_to_done is required",
                "is_nice_habit is required",
            ]
        );
    }

    #[test]
    fn test_create_defaults_to_daily() {
        let service = service();
        let owner = service.add_owner("ann", "+100").unwrap();

        let habit = service.create_habit(owner.id, draft("07:05")).unwrap();
        assert_eq!(habit.interval.unit, DEFAULT_INTERVAL.0);
        assert_eq!(habit.interval.every, DEFAULT_INTERVAL.1);
        assert_eq!(habit.time_to_done_secs, 90);
        assert_eq!(service.habit(habit.id).unwrap(), Some(habit));
    }

    #[test]
    fn test_create_for_unknown_owner() {
        let service = service();
        let err = service.create_habit(OwnerId(9), draft("07:05")).unwrap_err();
        assert!(matches!(err, ReminderError::OwnerNotFound(OwnerId(9))));
    }

    #[test]
    fn test_next_habit_skips_past_hours() {
        let service = service();
        let owner = service.add_owner("ann", "+100").unwrap();
        service.create_habit(owner.id, draft("07:05")).unwrap();
        let evening = service.create_habit(owner.id, draft("19:30")).unwrap();

        let now = service.config().now();
        let at_noon = now
            .with_hour(12)
            .and_then(|t| t.with_minute(0))
            .unwrap();
        assert_eq!(service.next_habit(owner.id, &at_noon).unwrap(), Some(evening));

        let late = at_noon.with_hour(22).unwrap();
        assert_eq!(service.next_habit(owner.id, &late).unwrap(), None);
    }

    #[test]
    fn test_habits_listed_by_time_of_day() {
        let service = service();
        let owner = service.add_owner("ann", "+100").unwrap();
        let evening = service.create_habit(owner.id, draft("19:30")).unwrap();
        let first_at_seven = service.create_habit(owner.id, draft("07:05")).unwrap();
        let second_at_seven = service.create_habit(owner.id, draft("07:05")).unwrap();
        let dawn = service.create_habit(owner.id, draft("6:59")).unwrap();

        let ids: Vec<HabitId> = service
            .habits_for(owner.id)
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![dawn.id, first_at_seven.id, second_at_seven.id, evening.id]);
    }

    #[test]
    fn test_delete_missing_habit() {
        let service = service();
        let err = service.delete_habit(HabitId(5)).unwrap_err();
        assert!(matches!(err, ReminderError::HabitNotFound(HabitId(5))));
    }
}
