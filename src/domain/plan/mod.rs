//! Billing plan definitions and cadence classification.

mod cycle_class;
#[allow(clippy::module_inception)]
mod plan;

pub use cycle_class::{classify, CycleClass, DAILY_CYCLE_MAX_LENGTH_DAYS};
pub use plan::{BillingMode, CycleUnit, Plan};
