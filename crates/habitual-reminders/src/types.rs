//! Habit and reminder job types.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use habitual_schedule::{CompositeSchedule, RecurrenceInterval, TimeOfDay};
use serde::{Deserialize, Serialize};

/// Row id of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub i64);

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row id of a habit owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user who owns habits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub username: String,
    /// Phone number used to match the owner when they first open a chat.
    pub phone: String,
    /// Chat to deliver reminders to, once the owner has authenticated.
    pub chat_id: Option<i64>,
}

/// A habit with its resolved schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub owner_id: OwnerId,
    /// Where the habit is performed.
    pub place: String,
    /// What the habit is.
    pub action: String,
    /// Clock time the habit is performed at.
    pub time_to_do: TimeOfDay,
    /// How often the habit repeats.
    pub interval: RecurrenceInterval,
    /// How long performing the habit takes, in seconds.
    pub time_to_done_secs: u32,
    /// Nice habits are rewards for useful ones and carry no reward themselves.
    pub is_nice_habit: bool,
    /// Nice habit performed as the reward for this one.
    pub related_habit: Option<HabitId>,
    pub reward: Option<String>,
    pub is_published: bool,
}

impl Habit {
    pub fn time_to_done(&self) -> Duration {
        Duration::seconds(i64::from(self.time_to_done_secs))
    }
}

/// Arguments the reminder task is invoked with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderArgs {
    pub habit_id: HabitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
}

/// A recurring reminder bound to one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderJob {
    pub id: i64,
    /// Unique name, `task_reminder_<habit>/U-<owner>`.
    pub name: String,
    /// Identifier of the task the scheduler invokes.
    pub task: String,
    /// Merged trigger schedule.
    pub schedule: CompositeSchedule,
    /// Earliest time the job may fire.
    pub start_time: DateTime<FixedOffset>,
    pub enabled: bool,
    /// Seconds a fired reminder stays valid.
    pub expire_seconds: u64,
    pub args: ReminderArgs,
    /// When the job last fired.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Bumped on every save so the dispatcher can see changes.
    pub revision: u32,
    pub changed_at: DateTime<Utc>,
}

impl ReminderJob {
    /// Check if this job should fire at `now` (local time).
    pub fn is_due(&self, now: &DateTime<FixedOffset>) -> bool {
        self.enabled
            && self.start_time <= *now
            && self.schedule.crontab.matches(now)
            && !self.ran_in_minute_of(now)
    }

    fn ran_in_minute_of(&self, now: &DateTime<FixedOffset>) -> bool {
        self.last_run_at
            .is_some_and(|last| last.timestamp().div_euclid(60) == now.timestamp().div_euclid(60))
    }
}
