//! Cadence classification of billing plans.
//!
//! Daily-cycle plans (recurring, unit days, length <= 3) require
//! hourly-granularity reminder logic; everything else follows the standard
//! day-granularity ladder. An unknown or missing plan classifies as
//! standard-cycle: daily-cycle drives far more frequent contact and must
//! require positive confirmation.

use serde::{Deserialize, Serialize};

use super::{BillingMode, CycleUnit, Plan};

/// Longest cycle, in days, that still counts as daily-cycle.
pub const DAILY_CYCLE_MAX_LENGTH_DAYS: u32 = 3;

/// Cadence bucket derived from a plan definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleClass {
    /// Whether the plan bills recurrently.
    pub is_recurring: bool,

    /// Cycle unit of the plan.
    pub unit: CycleUnit,

    /// Cycle length of the plan.
    pub length: u32,
}

impl CycleClass {
    /// True for recurring plans with a day-unit cycle of at most three days.
    pub fn is_daily_cycle(&self) -> bool {
        self.is_recurring
            && self.unit == CycleUnit::Days
            && self.length <= DAILY_CYCLE_MAX_LENGTH_DAYS
    }
}

/// Classifies a tenant's plan into its cadence bucket.
///
/// `None` (missing or unresolvable plan) yields the conservative
/// standard-cycle default.
pub fn classify(plan: Option<&Plan>) -> CycleClass {
    match plan {
        Some(p) => CycleClass {
            is_recurring: p.billing_mode == BillingMode::Recurring,
            unit: p.cycle_unit,
            length: p.cycle_length,
        },
        // Conservative default: a one-year one-time shape is never daily-cycle.
        None => CycleClass {
            is_recurring: false,
            unit: CycleUnit::Years,
            length: 1,
        },
    }
}
