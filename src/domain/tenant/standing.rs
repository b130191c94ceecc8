//! Payment standing of a tenant, mirrored from gateway truth.

use serde::{Deserialize, Serialize};

/// Current payment standing of a tenant's subscription.
///
/// Updated by the gateway reconciler; `Ok` is the only standing that
/// corresponds to a healthy recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStanding {
    /// Payments current, access renews normally.
    Ok,

    /// Awaiting a payment result from the gateway.
    Pending,

    /// Gateway reports the subscription paused.
    Paused,

    /// Gateway reports the subscription cancelled.
    Cancelled,

    /// Latest recurring charge was rejected.
    Rejected,
}

impl PaymentStanding {
    /// Whether this standing blocks further access extension.
    pub fn blocks_renewal(&self) -> bool {
        matches!(
            self,
            PaymentStanding::Paused | PaymentStanding::Cancelled | PaymentStanding::Rejected
        )
    }

    /// Stable string form for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStanding::Ok => "ok",
            PaymentStanding::Pending => "pending",
            PaymentStanding::Paused => "paused",
            PaymentStanding::Cancelled => "cancelled",
            PaymentStanding::Rejected => "rejected",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ok" => Some(PaymentStanding::Ok),
            "pending" => Some(PaymentStanding::Pending),
            "paused" => Some(PaymentStanding::Paused),
            "cancelled" => Some(PaymentStanding::Cancelled),
            "rejected" => Some(PaymentStanding::Rejected),
            _ => None,
        }
    }
}
