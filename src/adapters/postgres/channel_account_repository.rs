//! PostgreSQL implementation of ChannelAccountRepository.
//!
//! The hourly quota counter is bucketed by `hour_bucket_start`: reads report
//! zero for a stale bucket and the atomic increment rolls the bucket over in
//! the same statement, so no external reset job is needed.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{ChannelAccountId, DomainError, ErrorCode};
use crate::domain::notification::{AccountScope, ChannelAccount, ConnectionStatus};
use crate::ports::ChannelAccountRepository;

/// PostgreSQL implementation of the ChannelAccountRepository port.
pub struct PostgresChannelAccountRepository {
    pool: PgPool,
}

impl PostgresChannelAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a channel account.
#[derive(Debug, sqlx::FromRow)]
struct ChannelAccountRow {
    id: Uuid,
    name: String,
    scope: String,
    hourly_limit: i32,
    sent_this_hour: i32,
    connection_status: String,
}

impl TryFrom<ChannelAccountRow> for ChannelAccount {
    type Error = DomainError;

    fn try_from(row: ChannelAccountRow) -> Result<Self, Self::Error> {
        let scope = AccountScope::parse(&row.scope).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid account scope: {}", row.scope),
            )
        })?;
        let connection = ConnectionStatus::parse(&row.connection_status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid connection status: {}", row.connection_status),
            )
        })?;

        Ok(ChannelAccount {
            id: ChannelAccountId::from_uuid(row.id),
            name: row.name,
            scope,
            hourly_limit: u32::try_from(row.hourly_limit).unwrap_or(0),
            sent_this_hour: u32::try_from(row.sent_this_hour).unwrap_or(0),
            connection,
        })
    }
}

#[async_trait]
impl ChannelAccountRepository for PostgresChannelAccountRepository {
    async fn connected_by_scope(
        &self,
        scope: AccountScope,
    ) -> Result<Vec<ChannelAccount>, DomainError> {
        let rows: Vec<ChannelAccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, scope, hourly_limit,
                   CASE WHEN hour_bucket_start < DATE_TRUNC('hour', NOW())
                        THEN 0 ELSE sent_this_hour END AS sent_this_hour,
                   connection_status
            FROM channel_accounts
            WHERE scope = $1 AND connection_status = 'connected'
            ORDER BY name ASC
            "#,
        )
        .bind(scope.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to query channel accounts: {}", e),
            )
        })?;

        rows.into_iter().map(ChannelAccount::try_from).collect()
    }

    async fn increment_hourly(&self, id: &ChannelAccountId) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE channel_accounts SET
                sent_this_hour = CASE WHEN hour_bucket_start < DATE_TRUNC('hour', NOW())
                                      THEN 1 ELSE sent_this_hour + 1 END,
                hour_bucket_start = DATE_TRUNC('hour', NOW())
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to increment send counter: {}", e),
            )
        })?;
        Ok(())
    }

    async fn set_connection_status(
        &self,
        id: &ChannelAccountId,
        status: ConnectionStatus,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE channel_accounts SET connection_status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to update connection status: {}", e),
                )
            })?;
        Ok(())
    }
}
