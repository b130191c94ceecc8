//! Messaging channel accounts.
//!
//! Channel accounts are rate-limited credentials shared across all tenants.
//! The dispatcher rotates through connected accounts of the right scope,
//! preferring those under their hourly quota. The hour-bucketed counter is
//! reset externally; this module only reads it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ChannelAccountId;

/// What an account is allowed to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountScope {
    /// Transactional reminders and renewal notices.
    Notifications,

    /// Bulk campaigns; never used by this subsystem's dispatcher.
    Marketing,
}

impl AccountScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountScope::Notifications => "notifications",
            AccountScope::Marketing => "marketing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notifications" => Some(AccountScope::Notifications),
            "marketing" => Some(AccountScope::Marketing),
            _ => None,
        }
    }
}

/// Live connection state of an account on the messaging bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "connected" => Some(ConnectionStatus::Connected),
            "disconnected" => Some(ConnectionStatus::Disconnected),
            _ => None,
        }
    }
}

/// A rate-limited messaging credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: ChannelAccountId,

    /// Instance name on the messaging bridge.
    pub name: String,

    pub scope: AccountScope,

    /// Maximum messages per hour bucket.
    pub hourly_limit: u32,

    /// Messages sent in the current hour bucket.
    pub sent_this_hour: u32,

    pub connection: ConnectionStatus,
}

impl ChannelAccount {
    /// Whether the account still has quota in the current hour.
    pub fn under_quota(&self) -> bool {
        self.sent_this_hour < self.hourly_limit
    }

    /// Whether the bridge reports this account connected.
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }

    /// Whether the dispatcher may use this account right now.
    pub fn usable(&self) -> bool {
        self.is_connected() && self.under_quota()
    }

    /// Advances the local counter after a send, keeping an in-memory
    /// snapshot consistent with the repository's hourly increment.
    pub fn record_send(&mut self) {
        self.sent_this_hour += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(sent: u32, limit: u32, connection: ConnectionStatus) -> ChannelAccount {
        ChannelAccount {
            id: ChannelAccountId::new(),
            name: "notify-01".to_string(),
            scope: AccountScope::Notifications,
            hourly_limit: limit,
            sent_this_hour: sent,
            connection,
        }
    }

    #[test]
    fn under_quota_at_boundary() {
        assert!(account(29, 30, ConnectionStatus::Connected).under_quota());
        assert!(!account(30, 30, ConnectionStatus::Connected).under_quota());
    }

    #[test]
    fn disconnected_account_is_not_usable() {
        assert!(!account(0, 30, ConnectionStatus::Disconnected).usable());
    }

    #[test]
    fn connected_account_over_quota_is_not_usable() {
        assert!(!account(30, 30, ConnectionStatus::Connected).usable());
        assert!(account(10, 30, ConnectionStatus::Connected).usable());
    }

    #[test]
    fn record_send_consumes_quota() {
        let mut a = account(29, 30, ConnectionStatus::Connected);
        assert!(a.usable());
        a.record_send();
        assert!(!a.usable());
    }

    #[test]
    fn scope_roundtrips() {
        assert_eq!(
            AccountScope::parse(AccountScope::Notifications.as_str()),
            Some(AccountScope::Notifications)
        );
        assert_eq!(AccountScope::parse("broadcast"), None);
    }
}
