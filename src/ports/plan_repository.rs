//! Plan repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PlanId};
use crate::domain::plan::Plan;

/// Read-only access to billing plans.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError>;
}
