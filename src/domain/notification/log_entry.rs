//! Notification log entry.
//!
//! A log entry is written in `pending` status before every send attempt so
//! that a crash mid-send still leaves an auditable row, then updated to
//! `sent` or `failed` once the attempt completes. Entries are never deleted
//! by this subsystem.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{NotificationId, Timestamp};

/// What kind of notification a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ReminderThreeDay,
    ReminderOneDay,
    Expired,
    DailyReminder,
    DailyExpired,
    RenewalPayment,
    FailedRecurringPayment,
}

impl NotificationKind {
    /// Stable string form for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ReminderThreeDay => "reminder_three_day",
            NotificationKind::ReminderOneDay => "reminder_one_day",
            NotificationKind::Expired => "expired",
            NotificationKind::DailyReminder => "daily_reminder",
            NotificationKind::DailyExpired => "daily_expired",
            NotificationKind::RenewalPayment => "renewal_payment",
            NotificationKind::FailedRecurringPayment => "failed_recurring_payment",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reminder_three_day" => Some(NotificationKind::ReminderThreeDay),
            "reminder_one_day" => Some(NotificationKind::ReminderOneDay),
            "expired" => Some(NotificationKind::Expired),
            "daily_reminder" => Some(NotificationKind::DailyReminder),
            "daily_expired" => Some(NotificationKind::DailyExpired),
            "renewal_payment" => Some(NotificationKind::RenewalPayment),
            "failed_recurring_payment" => Some(NotificationKind::FailedRecurringPayment),
            _ => None,
        }
    }
}

/// Delivery status of a logged notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Written before the attempt, or left queued when no channel account
    /// was available. Pending entries are retried.
    Pending,

    /// Delivered to the channel.
    Sent,

    /// The channel rejected the send; `error` holds the cause.
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeliveryStatus::Pending),
            "sent" => Some(DeliveryStatus::Sent),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

/// One send attempt over the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLog {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub recipient: String,
    pub message: String,
    pub status: DeliveryStatus,
    pub sent_at: Option<Timestamp>,
    pub error: Option<String>,
    pub created_at: Timestamp,
}

impl NotificationLog {
    /// Creates a pending entry for an attempt about to be made.
    pub fn new_pending(
        kind: NotificationKind,
        recipient: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            recipient: recipient.into(),
            message: message.into(),
            status: DeliveryStatus::Pending,
            sent_at: None,
            error: None,
            created_at: Timestamp::now(),
        }
    }

    /// Marks the entry delivered at `now`.
    pub fn mark_sent(&mut self, now: Timestamp) {
        self.status = DeliveryStatus::Sent;
        self.sent_at = Some(now);
        self.error = None;
    }

    /// Marks the entry failed with the channel's error text.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = DeliveryStatus::Failed;
        self.error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_pending() {
        let entry = NotificationLog::new_pending(
            NotificationKind::DailyReminder,
            "+5511999990000",
            "Your access expires soon",
        );
        assert_eq!(entry.status, DeliveryStatus::Pending);
        assert!(entry.sent_at.is_none());
        assert!(entry.error.is_none());
    }

    #[test]
    fn mark_sent_clears_error() {
        let mut entry =
            NotificationLog::new_pending(NotificationKind::Expired, "x", "y");
        entry.mark_failed("timeout");
        entry.mark_sent(Timestamp::now());
        assert_eq!(entry.status, DeliveryStatus::Sent);
        assert!(entry.error.is_none());
        assert!(entry.sent_at.is_some());
    }

    #[test]
    fn mark_failed_records_cause() {
        let mut entry =
            NotificationLog::new_pending(NotificationKind::Expired, "x", "y");
        entry.mark_failed("connection closed");
        assert_eq!(entry.status, DeliveryStatus::Failed);
        assert_eq!(entry.error.as_deref(), Some("connection closed"));
    }

    #[test]
    fn kind_roundtrips_through_strings() {
        for kind in [
            NotificationKind::ReminderThreeDay,
            NotificationKind::ReminderOneDay,
            NotificationKind::Expired,
            NotificationKind::DailyReminder,
            NotificationKind::DailyExpired,
            NotificationKind::RenewalPayment,
            NotificationKind::FailedRecurringPayment,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
    }
}
