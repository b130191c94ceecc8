//! Tenant aggregate entity.
//!
//! A Tenant is an account holder whose paid access is tracked by its
//! expiration timestamp. Two independent jobs mutate the same tenant rows
//! (reminders update `last_reminder_sent_at`, reconciliation updates standing
//! and expiration), so every mutating operation here reports whether it
//! actually changed state and the extension rule is monotonic.
//!
//! # Invariants
//!
//! - `access_expires_at` never moves earlier through `extend_access`;
//!   only `block_access` (explicit gateway cancellation or pause) may
//!   shorten it.
//! - Blocking access never flips `is_active`: login must remain possible so
//!   the tenant can reach a renewal screen.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PlanId, TenantId, Timestamp};

use super::PaymentStanding;

/// Tenant account with tracked paid-access expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique identifier for this tenant.
    pub id: TenantId,

    /// Contact email, also the payer identity on the gateways.
    pub email: String,

    /// Messaging contact (E.164), if the tenant provided one.
    pub phone: Option<String>,

    /// Billing plan, if one is assigned.
    pub plan_id: Option<PlanId>,

    /// When paid access ends. `None` means access was never granted.
    pub access_expires_at: Option<Timestamp>,

    /// Whether the account itself is enabled.
    pub is_active: bool,

    /// Payment standing mirrored from gateway truth.
    pub payment_standing: PaymentStanding,

    /// Last time any expiration reminder was sent to this tenant.
    pub last_reminder_sent_at: Option<Timestamp>,

    /// When the tenant was created.
    pub created_at: Timestamp,

    /// When the tenant was last updated.
    pub updated_at: Timestamp,
}

impl Tenant {
    /// Extends paid access to `new_expiry` if it is strictly later than the
    /// current expiration.
    ///
    /// Returns true if the tenant changed. A successful extension also
    /// restores `Ok` standing and re-activates the account, since it is only
    /// called when a gateway reports an approved charge.
    pub fn extend_access(&mut self, new_expiry: Timestamp) -> bool {
        let extends = match self.access_expires_at {
            Some(current) => new_expiry.is_after(&current),
            None => true,
        };

        let standing_changes = self.payment_standing != PaymentStanding::Ok;
        let activates = !self.is_active;

        if !extends && !standing_changes && !activates {
            return false;
        }

        if extends {
            self.access_expires_at = Some(new_expiry);
        }
        self.payment_standing = PaymentStanding::Ok;
        self.is_active = true;
        self.updated_at = Timestamp::now();
        true
    }

    /// Blocks access as of `now` because the gateway explicitly reported the
    /// subscription as paused, cancelled, or indefinitely pending.
    ///
    /// The account stays active so the tenant can still log in and renew.
    /// Returns true if the tenant changed.
    pub fn block_access(&mut self, standing: PaymentStanding, now: Timestamp) -> bool {
        let expiry_shrinks = match self.access_expires_at {
            Some(current) => current.is_after(&now),
            None => false,
        };
        let standing_changes = self.payment_standing != standing;

        if !expiry_shrinks && !standing_changes {
            return false;
        }

        if expiry_shrinks {
            self.access_expires_at = Some(now);
        }
        self.payment_standing = standing;
        self.updated_at = Timestamp::now();
        true
    }

    /// Records that a reminder was sent at `now`.
    pub fn record_reminder(&mut self, now: Timestamp) {
        self.last_reminder_sent_at = Some(now);
        self.updated_at = Timestamp::now();
    }

    /// Whether this tenant can be contacted on the messaging channel.
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().map(|p| !p.is_empty()).unwrap_or(false)
    }
}
