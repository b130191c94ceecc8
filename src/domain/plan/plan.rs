//! Billing plan entity.
//!
//! A Plan describes how a tenant is billed: one-time or recurring, with a
//! cycle expressed as a length and unit. Plans are read-only inputs to
//! cadence classification and expiration-date arithmetic; they never change
//! during a scheduler run.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PlanId, Timestamp};

/// Whether a plan bills once or repeats every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    /// Single purchase granting one cycle of access.
    OneTime,

    /// Recurring billing renewing every cycle.
    Recurring,
}

/// Unit of a plan's billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl CycleUnit {
    /// Cycle length in days for a single unit.
    ///
    /// Months and years use the 30/365-day approximation; exact calendar
    /// arithmetic is not required for access-window extension.
    pub fn days(&self) -> i64 {
        match self {
            CycleUnit::Days => 1,
            CycleUnit::Weeks => 7,
            CycleUnit::Months => 30,
            CycleUnit::Years => 365,
        }
    }
}

/// Billing plan - immutable pricing and cadence definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,

    /// Display name.
    pub name: String,

    /// One-time purchase or recurring billing.
    pub billing_mode: BillingMode,

    /// Number of cycle units per billing period.
    pub cycle_length: u32,

    /// Unit of the billing cycle.
    pub cycle_unit: CycleUnit,

    /// Price in minor currency units (cents).
    pub price_cents: i64,
}

impl Plan {
    /// Whether this plan bills on a recurring schedule.
    pub fn is_recurring(&self) -> bool {
        self.billing_mode == BillingMode::Recurring
    }

    /// Length of one full billing cycle, in days.
    pub fn cycle_days(&self) -> i64 {
        i64::from(self.cycle_length) * self.cycle_unit.days()
    }

    /// Computes the access expiration for one paid cycle starting at `base`.
    ///
    /// Used by the reconciler with `base = max(current_expiry, approval_date)`
    /// so that repeated reconciliation of the same charge converges.
    pub fn expiration_from(&self, base: Timestamp) -> Timestamp {
        base.plus_days(self.cycle_days())
    }
}
