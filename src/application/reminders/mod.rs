//! Expiration reminders, renewal payment generation, and the
//! failed-recurring-payment ladder.

mod expiration_reminders;
mod failed_payment_sequencer;
mod messages;
mod renewal_payment;

pub use expiration_reminders::{ExpirationReminderJob, ReminderStats};
pub use failed_payment_sequencer::{
    FailedPaymentSequencer, SequencerStats, FAILURE_LADDER_DAYS, FAILURE_REMINDER_COOLDOWN_HOURS,
};
pub use renewal_payment::{RenewalPaymentGenerator, BOLETO_DUE_DAYS, PIX_LIFETIME_MINUTES};
