//! Messaging channel port.

use async_trait::async_trait;

use crate::domain::notification::{ChannelAccount, ConnectionStatus};

/// Contract for the messaging bridge the channel accounts live on.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Queries the live connection state of an account.
    async fn connection_status(
        &self,
        account: &ChannelAccount,
    ) -> Result<ConnectionStatus, ChannelError>;

    /// Sends a text message to a contact through the given account.
    async fn send_text(
        &self,
        account: &ChannelAccount,
        contact: &str,
        text: &str,
    ) -> Result<(), ChannelError>;
}

/// Error from a messaging channel operation.
#[derive(Debug, Clone)]
pub struct ChannelError {
    message: String,
}

impl ChannelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ChannelError {}
