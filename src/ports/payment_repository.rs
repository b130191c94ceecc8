//! Payment record repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId};
use crate::domain::payment::PaymentRecord;

/// Persistence contract for payment records.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn save(&self, record: &PaymentRecord) -> Result<(), DomainError>;

    async fn update(&self, record: &PaymentRecord) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError>;

    /// Most recent approved payment for a tenant, used to recover a stored
    /// tax document for boleto generation.
    async fn last_approved_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// Rejected recurring payments with an open reminder ladder
    /// (failure timestamp recorded, fewer than three reminders sent).
    async fn rejected_recurring(&self) -> Result<Vec<PaymentRecord>, DomainError>;

    /// Records carrying a gateway reference that are non-terminal or
    /// recently terminal; the reconciler's worklist.
    async fn open_gateway_records(&self) -> Result<Vec<PaymentRecord>, DomainError>;
}
