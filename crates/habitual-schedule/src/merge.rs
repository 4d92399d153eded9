//! Merging a time of day with a recurrence interval.

use tracing::debug;

use crate::{
    CompositeSchedule, CronField, Crontab, RecurrenceInterval, ScheduleError, ScheduleStore,
    TimeOfDay,
};

/// Combine a time-of-day crontab with an interval crontab.
///
/// First match wins:
/// 1. a minute step fires every N minutes, ignoring the clock time;
/// 2. an hour step fires on minute 0 every N hours, ignoring the clock time;
/// 3. otherwise the clock time is kept and the day step applies.
pub fn merge_crontab(time_of_day: &Crontab, interval: &Crontab) -> Crontab {
    if !interval.minute.is_any() {
        Crontab::new(interval.minute, CronField::Any, CronField::Any)
    } else if !interval.hour.is_any() {
        // The configured minute is dropped here, not carried over
        Crontab::new(CronField::Value(0), interval.hour, CronField::Any)
    } else {
        Crontab::new(time_of_day.minute, time_of_day.hour, interval.day_of_month)
    }
}

/// Merge and intern the schedule a reminder job should run on.
pub fn merge(
    store: &ScheduleStore<'_>,
    time_of_day: &TimeOfDay,
    interval: &RecurrenceInterval,
) -> Result<CompositeSchedule, ScheduleError> {
    let crontab = merge_crontab(&time_of_day.crontab(), &interval.crontab());
    debug!(
        time_of_day = %time_of_day,
        interval = %interval.crontab(),
        merged = %crontab,
        "merged schedules"
    );
    store.get_or_create_composite(crontab)
}
