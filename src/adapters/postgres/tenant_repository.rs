//! PostgreSQL implementation of TenantRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, PlanId, TenantId, Timestamp};
use crate::domain::tenant::{ExpiryWindow, PaymentStanding, Tenant};
use crate::ports::TenantRepository;

/// PostgreSQL implementation of the TenantRepository port.
pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Shared window query: active tenants whose expiration falls inside the
    /// half-open `[from, to)` window.
    async fn in_window(&self, window: ExpiryWindow) -> Result<Vec<Tenant>, DomainError> {
        let rows: Vec<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, email, phone, plan_id, access_expires_at, is_active,
                   payment_standing, last_reminder_sent_at, created_at, updated_at
            FROM tenants
            WHERE is_active = TRUE
              AND access_expires_at IS NOT NULL
              AND access_expires_at >= $1
              AND access_expires_at < $2
            ORDER BY access_expires_at ASC
            "#,
        )
        .bind(window.from.as_datetime())
        .bind(window.to.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to query tenants by window: {}", e),
            )
        })?;

        rows.into_iter().map(Tenant::try_from).collect()
    }
}

/// Database row representation of a tenant.
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    email: String,
    phone: Option<String>,
    plan_id: Option<Uuid>,
    access_expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    payment_standing: String,
    last_reminder_sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let payment_standing = PaymentStanding::parse(&row.payment_standing).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid payment standing: {}", row.payment_standing),
            )
        })?;

        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            email: row.email,
            phone: row.phone,
            plan_id: row.plan_id.map(PlanId::from_uuid),
            access_expires_at: row.access_expires_at.map(Timestamp::from_datetime),
            is_active: row.is_active,
            payment_standing,
            last_reminder_sent_at: row.last_reminder_sent_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, email, phone, plan_id, access_expires_at, is_active,
                   payment_standing, last_reminder_sent_at, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find tenant: {}", e))
        })?;

        row.map(Tenant::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, email, phone, plan_id, access_expires_at, is_active,
                   payment_standing, last_reminder_sent_at, created_at, updated_at
            FROM tenants
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find tenant: {}", e))
        })?;

        row.map(Tenant::try_from).transpose()
    }

    async fn update(&self, tenant: &Tenant) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                email = $2,
                phone = $3,
                plan_id = $4,
                access_expires_at = $5,
                is_active = $6,
                payment_standing = $7,
                last_reminder_sent_at = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.email)
        .bind(&tenant.phone)
        .bind(tenant.plan_id.map(|p| *p.as_uuid()))
        .bind(tenant.access_expires_at.map(|t| *t.as_datetime()))
        .bind(tenant.is_active)
        .bind(tenant.payment_standing.as_str())
        .bind(tenant.last_reminder_sent_at.map(|t| *t.as_datetime()))
        .bind(tenant.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update tenant: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::TenantNotFound,
                "Tenant not found",
            ));
        }
        Ok(())
    }

    async fn record_reminder_sent(
        &self,
        id: &TenantId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        // Single-column write; never races with the reconciler's full update.
        sqlx::query(
            "UPDATE tenants SET last_reminder_sent_at = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record reminder: {}", e),
            )
        })?;
        Ok(())
    }

    async fn expiring_between(&self, window: ExpiryWindow) -> Result<Vec<Tenant>, DomainError> {
        self.in_window(window).await
    }

    async fn expired_between(&self, window: ExpiryWindow) -> Result<Vec<Tenant>, DomainError> {
        self.in_window(window).await
    }
}
