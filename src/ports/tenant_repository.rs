//! Tenant repository port, including the expiration query layer.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::tenant::{ExpiryWindow, Tenant};

/// Persistence contract for tenants.
///
/// The window queries return only active tenants with a non-null
/// expiration; callers compute the absolute bounds once per tick so slow
/// batches do not drift.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, DomainError>;

    async fn update(&self, tenant: &Tenant) -> Result<(), DomainError>;

    /// Atomically records the last-reminder timestamp without touching the
    /// rest of the row (the reconciler may be writing it concurrently).
    async fn record_reminder_sent(
        &self,
        id: &TenantId,
        at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Active tenants whose access expires inside `window`.
    async fn expiring_between(&self, window: ExpiryWindow) -> Result<Vec<Tenant>, DomainError>;

    /// Active tenants whose access expired inside `window`.
    async fn expired_between(&self, window: ExpiryWindow) -> Result<Vec<Tenant>, DomainError>;
}
