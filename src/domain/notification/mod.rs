//! Notification log entries, channel accounts, and reminder dedup buckets.

mod buckets;
mod channel_account;
mod log_entry;

pub use buckets::{
    ReminderBucket, DAILY_CYCLE_MIN_GAP_HOURS, DAILY_EXPIRED_LOOKBACK_HOURS,
    DAILY_FINAL_LEAD_HOURS, DAILY_REMINDER_WINDOW_HOURS, EXPIRED_MIN_GAP_HOURS,
    ONE_DAY_MIN_GAP_HOURS, THREE_DAY_MIN_GAP_HOURS,
};
pub use channel_account::{AccountScope, ChannelAccount, ConnectionStatus};
pub use log_entry::{DeliveryStatus, NotificationKind, NotificationLog};
