//! Reminder buckets and the time-window dedup gate.
//!
//! The scheduler ticks hourly, so each bucket enforces a minimum gap since
//! the tenant's last reminder. Gaps sit slightly under the nominal bucket
//! spacing (20h for a daily cadence, 48h for a 3-day one) to tolerate
//! scheduler jitter while still preventing duplicate same-day sends.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::NotificationKind;

/// Minimum gap before re-sending the 3-day reminder.
pub const THREE_DAY_MIN_GAP_HOURS: i64 = 48;

/// Minimum gap before re-sending the 1-day reminder.
pub const ONE_DAY_MIN_GAP_HOURS: i64 = 20;

/// Minimum gap before re-sending the expired notice.
pub const EXPIRED_MIN_GAP_HOURS: i64 = 20;

/// Minimum gap between daily-cycle reminder or expired notices.
pub const DAILY_CYCLE_MIN_GAP_HOURS: i64 = 4;

/// Daily-cycle tenants are selected when expiring within this many hours.
pub const DAILY_REMINDER_WINDOW_HOURS: i64 = 24;

/// Within this lead the daily-cycle reminder switches to its urgent wording.
pub const DAILY_FINAL_LEAD_HOURS: i64 = 6;

/// Daily-cycle expired notices look back this many hours.
pub const DAILY_EXPIRED_LOOKBACK_HOURS: i64 = 6;

/// Reminder bucket: the dedup dimension for tenant-level notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderBucket {
    /// Standard-cycle, expiring in three days.
    ThreeDay,

    /// Standard-cycle, expiring within a day.
    OneDay,

    /// Standard-cycle, expired yesterday.
    Expired,

    /// Daily-cycle, expiring within the daily window.
    DailyReminder,

    /// Daily-cycle, expired within the lookback window.
    DailyExpired,
}

impl ReminderBucket {
    /// Minimum hours since the last reminder before this bucket fires again.
    pub fn min_gap_hours(&self) -> i64 {
        match self {
            ReminderBucket::ThreeDay => THREE_DAY_MIN_GAP_HOURS,
            ReminderBucket::OneDay => ONE_DAY_MIN_GAP_HOURS,
            ReminderBucket::Expired => EXPIRED_MIN_GAP_HOURS,
            ReminderBucket::DailyReminder | ReminderBucket::DailyExpired => {
                DAILY_CYCLE_MIN_GAP_HOURS
            }
        }
    }

    /// Dedup gate: whether enough time has passed since `last_sent` for this
    /// bucket to fire at `now`. A tenant never contacted always qualifies.
    pub fn should_send(&self, last_sent: Option<Timestamp>, now: Timestamp) -> bool {
        match last_sent {
            None => true,
            Some(last) => now.hours_since(&last) >= self.min_gap_hours(),
        }
    }

    /// Only the 1-day and daily-cycle reminder buckets generate a renewal
    /// payment; three days out is too early for a 30-minute PIX instrument.
    pub fn triggers_renewal_payment(&self) -> bool {
        matches!(self, ReminderBucket::OneDay | ReminderBucket::DailyReminder)
    }

    /// Notification log kind recorded for sends from this bucket.
    pub fn notification_kind(&self) -> NotificationKind {
        match self {
            ReminderBucket::ThreeDay => NotificationKind::ReminderThreeDay,
            ReminderBucket::OneDay => NotificationKind::ReminderOneDay,
            ReminderBucket::Expired => NotificationKind::Expired,
            ReminderBucket::DailyReminder => NotificationKind::DailyReminder,
            ReminderBucket::DailyExpired => NotificationKind::DailyExpired,
        }
    }
}
