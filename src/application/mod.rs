//! Application layer: use-case handlers and the scheduler driver.

pub mod dispatch;
pub mod reconciliation;
pub mod reminders;
pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerIntervals, SchedulerStatus};
