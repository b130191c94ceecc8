//! PostgreSQL implementation of NotificationLogRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, NotificationId, Timestamp};
use crate::domain::notification::{DeliveryStatus, NotificationKind, NotificationLog};
use crate::ports::NotificationLogRepository;

/// PostgreSQL implementation of the NotificationLogRepository port.
pub struct PostgresNotificationLogRepository {
    pool: PgPool,
}

impl PostgresNotificationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a notification log entry.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    kind: String,
    recipient: String,
    message: String,
    status: String,
    sent_at: Option<DateTime<Utc>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for NotificationLog {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::parse(&row.kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid notification kind: {}", row.kind),
            )
        })?;
        let status = DeliveryStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid delivery status: {}", row.status),
            )
        })?;

        Ok(NotificationLog {
            id: NotificationId::from_uuid(row.id),
            kind,
            recipient: row.recipient,
            message: row.message,
            status,
            sent_at: row.sent_at.map(Timestamp::from_datetime),
            error: row.error,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl NotificationLogRepository for PostgresNotificationLogRepository {
    async fn save(&self, entry: &NotificationLog) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO notification_log (
                id, kind, recipient, message, status, sent_at, error, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.kind.as_str())
        .bind(&entry.recipient)
        .bind(&entry.message)
        .bind(entry.status.as_str())
        .bind(entry.sent_at.map(|t| *t.as_datetime()))
        .bind(&entry.error)
        .bind(entry.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save notification log entry: {}", e),
            )
        })?;
        Ok(())
    }

    async fn update(&self, entry: &NotificationLog) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_log SET
                status = $2,
                sent_at = $3,
                error = $4
            WHERE id = $1
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.status.as_str())
        .bind(entry.sent_at.map(|t| *t.as_datetime()))
        .bind(&entry.error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update notification log entry: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "Notification log entry not found",
            ));
        }
        Ok(())
    }

    async fn pending(&self, limit: u32) -> Result<Vec<NotificationLog>, DomainError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, kind, recipient, message, status, sent_at, error, created_at
            FROM notification_log
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to query pending notifications: {}", e),
            )
        })?;

        rows.into_iter().map(NotificationLog::try_from).collect()
    }
}
