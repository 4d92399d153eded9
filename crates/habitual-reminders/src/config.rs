//! Reminder configuration.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Settings shared by job binding and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderConfig {
    /// Local time zone that habit times are written in.
    pub utc_offset: FixedOffset,
    /// Seconds a queued reminder stays valid.
    pub expire_seconds: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            expire_seconds: 3600,
        }
    }
}

impl ReminderConfig {
    /// Current wall-clock time in the configured zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}
