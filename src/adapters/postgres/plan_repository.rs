//! PostgreSQL implementation of PlanRepository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, PlanId};
use crate::domain::plan::{BillingMode, CycleUnit, Plan};
use crate::ports::PlanRepository;

/// PostgreSQL implementation of the PlanRepository port.
pub struct PostgresPlanRepository {
    pool: PgPool,
}

impl PostgresPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a plan.
#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    billing_mode: String,
    cycle_length: i32,
    cycle_unit: String,
    price_cents: i64,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(Plan {
            id: PlanId::from_uuid(row.id),
            name: row.name,
            billing_mode: parse_billing_mode(&row.billing_mode)?,
            cycle_length: u32::try_from(row.cycle_length).map_err(|_| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid cycle length: {}", row.cycle_length),
                )
            })?,
            cycle_unit: parse_cycle_unit(&row.cycle_unit)?,
            price_cents: row.price_cents,
        })
    }
}

fn parse_billing_mode(s: &str) -> Result<BillingMode, DomainError> {
    match s.to_lowercase().as_str() {
        "one_time" => Ok(BillingMode::OneTime),
        "recurring" => Ok(BillingMode::Recurring),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid billing mode: {}", s),
        )),
    }
}

fn parse_cycle_unit(s: &str) -> Result<CycleUnit, DomainError> {
    match s.to_lowercase().as_str() {
        "days" => Ok(CycleUnit::Days),
        "weeks" => Ok(CycleUnit::Weeks),
        "months" => Ok(CycleUnit::Months),
        "years" => Ok(CycleUnit::Years),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid cycle unit: {}", s),
        )),
    }
}

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, billing_mode, cycle_length, cycle_unit, price_cents
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find plan: {}", e))
        })?;

        row.map(Plan::try_from).transpose()
    }
}
