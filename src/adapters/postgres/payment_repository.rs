//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, PlanId, Timestamp};
use crate::domain::payment::{
    BoletoArtifact, GatewayRefs, PaymentRecord, PaymentStatus, PixArtifact,
    MAX_FAILURE_REMINDERS,
};
use crate::ports::PaymentRepository;

const SELECT_COLUMNS: &str = r#"
    id, tenant_email, plan_id, status,
    mercado_pago_payment_id, mercado_pago_subscription_id,
    asaas_payment_id, asaas_subscription_id,
    amount_cents, document,
    pix_code, pix_qr_base64, pix_expires_at,
    boleto_line_code, boleto_url, boleto_due_at,
    failed_at, last_failure_reminder_at, reminders_sent,
    created_at, updated_at
"#;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment record. PIX and boleto artifacts
/// are flattened into nullable column groups.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    tenant_email: String,
    plan_id: Uuid,
    status: String,
    mercado_pago_payment_id: Option<String>,
    mercado_pago_subscription_id: Option<String>,
    asaas_payment_id: Option<String>,
    asaas_subscription_id: Option<String>,
    amount_cents: i64,
    document: Option<String>,
    pix_code: Option<String>,
    pix_qr_base64: Option<String>,
    pix_expires_at: Option<DateTime<Utc>>,
    boleto_line_code: Option<String>,
    boleto_url: Option<String>,
    boleto_due_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    last_failure_reminder_at: Option<DateTime<Utc>>,
    reminders_sent: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = PaymentStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid payment status: {}", row.status),
            )
        })?;

        let pix = match (row.pix_code, row.pix_qr_base64, row.pix_expires_at) {
            (Some(code), Some(qr_base64), Some(expires_at)) => Some(PixArtifact {
                code,
                qr_base64,
                expires_at: Timestamp::from_datetime(expires_at),
            }),
            _ => None,
        };
        let boleto = match (row.boleto_line_code, row.boleto_url, row.boleto_due_at) {
            (Some(line_code), Some(url), Some(due_at)) => Some(BoletoArtifact {
                line_code,
                url,
                due_at: Timestamp::from_datetime(due_at),
            }),
            _ => None,
        };

        Ok(PaymentRecord {
            id: PaymentId::from_uuid(row.id),
            tenant_email: row.tenant_email,
            plan_id: PlanId::from_uuid(row.plan_id),
            status,
            gateway_refs: GatewayRefs {
                mercado_pago_payment_id: row.mercado_pago_payment_id,
                mercado_pago_subscription_id: row.mercado_pago_subscription_id,
                asaas_payment_id: row.asaas_payment_id,
                asaas_subscription_id: row.asaas_subscription_id,
            },
            amount_cents: row.amount_cents,
            document: row.document,
            pix,
            boleto,
            failed_at: row.failed_at.map(Timestamp::from_datetime),
            last_failure_reminder_at: row.last_failure_reminder_at.map(Timestamp::from_datetime),
            reminders_sent: u32::try_from(row.reminders_sent).unwrap_or(0),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_records (
                id, tenant_email, plan_id, status,
                mercado_pago_payment_id, mercado_pago_subscription_id,
                asaas_payment_id, asaas_subscription_id,
                amount_cents, document,
                pix_code, pix_qr_base64, pix_expires_at,
                boleto_line_code, boleto_url, boleto_due_at,
                failed_at, last_failure_reminder_at, reminders_sent,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                      $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.tenant_email)
        .bind(record.plan_id.as_uuid())
        .bind(record.status.as_str())
        .bind(&record.gateway_refs.mercado_pago_payment_id)
        .bind(&record.gateway_refs.mercado_pago_subscription_id)
        .bind(&record.gateway_refs.asaas_payment_id)
        .bind(&record.gateway_refs.asaas_subscription_id)
        .bind(record.amount_cents)
        .bind(&record.document)
        .bind(record.pix.as_ref().map(|p| p.code.clone()))
        .bind(record.pix.as_ref().map(|p| p.qr_base64.clone()))
        .bind(record.pix.as_ref().map(|p| *p.expires_at.as_datetime()))
        .bind(record.boleto.as_ref().map(|b| b.line_code.clone()))
        .bind(record.boleto.as_ref().map(|b| b.url.clone()))
        .bind(record.boleto.as_ref().map(|b| *b.due_at.as_datetime()))
        .bind(record.failed_at.map(|t| *t.as_datetime()))
        .bind(record.last_failure_reminder_at.map(|t| *t.as_datetime()))
        .bind(record.reminders_sent as i32)
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save payment: {}", e))
        })?;
        Ok(())
    }

    async fn update(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_records SET
                status = $2,
                mercado_pago_payment_id = $3,
                mercado_pago_subscription_id = $4,
                asaas_payment_id = $5,
                asaas_subscription_id = $6,
                document = $7,
                pix_code = $8,
                pix_qr_base64 = $9,
                pix_expires_at = $10,
                boleto_line_code = $11,
                boleto_url = $12,
                boleto_due_at = $13,
                failed_at = $14,
                last_failure_reminder_at = $15,
                reminders_sent = $16,
                updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.status.as_str())
        .bind(&record.gateway_refs.mercado_pago_payment_id)
        .bind(&record.gateway_refs.mercado_pago_subscription_id)
        .bind(&record.gateway_refs.asaas_payment_id)
        .bind(&record.gateway_refs.asaas_subscription_id)
        .bind(&record.document)
        .bind(record.pix.as_ref().map(|p| p.code.clone()))
        .bind(record.pix.as_ref().map(|p| p.qr_base64.clone()))
        .bind(record.pix.as_ref().map(|p| *p.expires_at.as_datetime()))
        .bind(record.boleto.as_ref().map(|b| b.line_code.clone()))
        .bind(record.boleto.as_ref().map(|b| b.url.clone()))
        .bind(record.boleto.as_ref().map(|b| *b.due_at.as_datetime()))
        .bind(record.failed_at.map(|t| *t.as_datetime()))
        .bind(record.last_failure_reminder_at.map(|t| *t.as_datetime()))
        .bind(record.reminders_sent as i32)
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update payment: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                "Payment record not found",
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM payment_records WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find payment: {}", e))
        })?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn last_approved_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM payment_records
            WHERE LOWER(tenant_email) = LOWER($1) AND status = 'approved'
            ORDER BY updated_at DESC
            LIMIT 1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find approved payment: {}", e),
            )
        })?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn rejected_recurring(&self) -> Result<Vec<PaymentRecord>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM payment_records
            WHERE status = 'rejected'
              AND failed_at IS NOT NULL
              AND reminders_sent < $1
              AND (mercado_pago_subscription_id IS NOT NULL
                   OR asaas_subscription_id IS NOT NULL)
            ORDER BY failed_at ASC
            "#
        ))
        .bind(MAX_FAILURE_REMINDERS as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to query rejected payments: {}", e),
            )
        })?;

        rows.into_iter().map(PaymentRecord::try_from).collect()
    }

    async fn open_gateway_records(&self) -> Result<Vec<PaymentRecord>, DomainError> {
        // Non-terminal records always; terminal ones only while fresh, so a
        // late gateway status flip is still caught.
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM payment_records
            WHERE (mercado_pago_payment_id IS NOT NULL
                   OR mercado_pago_subscription_id IS NOT NULL
                   OR asaas_payment_id IS NOT NULL
                   OR asaas_subscription_id IS NOT NULL)
              AND (status IN ('pending', 'rejected')
                   OR updated_at > NOW() - INTERVAL '48 hours')
            ORDER BY updated_at ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to query open gateway records: {}", e),
            )
        })?;

        rows.into_iter().map(PaymentRecord::try_from).collect()
    }
}
