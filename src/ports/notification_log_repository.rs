//! Notification log repository port.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::notification::NotificationLog;

/// Append/update access to the notification log. Entries are never deleted.
#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    async fn save(&self, entry: &NotificationLog) -> Result<(), DomainError>;

    async fn update(&self, entry: &NotificationLog) -> Result<(), DomainError>;

    /// Oldest pending entries, up to `limit`, for the retry pass.
    async fn pending(&self, limit: u32) -> Result<Vec<NotificationLog>, DomainError>;
}
