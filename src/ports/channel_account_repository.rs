//! Channel account repository port.

use async_trait::async_trait;

use crate::domain::foundation::{ChannelAccountId, DomainError};
use crate::domain::notification::{AccountScope, ChannelAccount, ConnectionStatus};

/// Persistence contract for messaging channel accounts.
///
/// The hourly counter reset is maintained externally; this port only
/// increments it atomically.
#[async_trait]
pub trait ChannelAccountRepository: Send + Sync {
    /// Connected accounts of the given scope, in stable order for
    /// round-robin rotation.
    async fn connected_by_scope(
        &self,
        scope: AccountScope,
    ) -> Result<Vec<ChannelAccount>, DomainError>;

    /// Atomically increments the hour-bucketed send counter.
    async fn increment_hourly(&self, id: &ChannelAccountId) -> Result<(), DomainError>;

    /// Records a connection-state change observed on the bridge.
    async fn set_connection_status(
        &self,
        id: &ChannelAccountId,
        status: ConnectionStatus,
    ) -> Result<(), DomainError>;
}
