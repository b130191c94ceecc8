//! Hourly expiration reminder job.
//!
//! One tick computes all four expiration windows against the same clock
//! reading, routes each tenant into its reminder bucket by plan cadence,
//! applies the dedup gate, and fires the reminder over email and the
//! messaging channel. The 1-day and daily-cycle buckets also generate
//! renewal payment instruments.
//!
//! Tenant processing is error-isolated: one tenant failing never stops the
//! batch, it is counted and logged.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::dispatch::NotificationDispatcher;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::notification::{
    NotificationKind, ReminderBucket, DAILY_EXPIRED_LOOKBACK_HOURS, DAILY_FINAL_LEAD_HOURS,
    DAILY_REMINDER_WINDOW_HOURS,
};
use crate::domain::plan::{classify, Plan};
use crate::domain::tenant::{ExpiryWindow, Tenant};
use crate::ports::{EmailSender, OutboundEmail, PlanRepository, TenantRepository};

use super::messages;
use super::RenewalPaymentGenerator;

/// Standard-cycle early reminder goes out this many days ahead.
pub const THREE_DAY_LEAD_DAYS: i64 = 3;

/// Outcome counters for one reminder tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderStats {
    pub three_day: u32,
    pub one_day: u32,
    pub expired: u32,
    pub daily_reminder: u32,
    pub daily_expired: u32,
    pub skipped_dedup: u32,
    pub renewal_payments: u32,
    pub errors: u32,
}

impl ReminderStats {
    /// Total reminders actually sent.
    pub fn sent(&self) -> u32 {
        self.three_day + self.one_day + self.expired + self.daily_reminder + self.daily_expired
    }
}

enum Outcome {
    Skipped,
    Sent { renewal_generated: bool },
}

/// Scans the expiration windows and sends due reminders.
pub struct ExpirationReminderJob {
    tenants: Arc<dyn TenantRepository>,
    plans: Arc<dyn PlanRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    email: Arc<dyn EmailSender>,
    renewal: Arc<RenewalPaymentGenerator>,
}

impl ExpirationReminderJob {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        plans: Arc<dyn PlanRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        email: Arc<dyn EmailSender>,
        renewal: Arc<RenewalPaymentGenerator>,
    ) -> Self {
        Self {
            tenants,
            plans,
            dispatcher,
            email,
            renewal,
        }
    }

    /// Runs one reminder tick.
    pub async fn run(&self) -> Result<ReminderStats, DomainError> {
        let now = Timestamp::now();
        self.run_at(now).await
    }

    /// Tick against an explicit clock reading. All windows derive from the
    /// same `now` so a slow batch does not drift.
    pub async fn run_at(&self, now: Timestamp) -> Result<ReminderStats, DomainError> {
        let mut stats = ReminderStats::default();

        // Expiring within the next 24 hours: 1-day bucket for standard
        // cadence, daily-reminder bucket for daily cadence.
        let soon = ExpiryWindow::hours_ahead(now, DAILY_REMINDER_WINDOW_HOURS);
        for tenant in self.tenants.expiring_between(soon).await? {
            let plan = self.resolve_plan(&tenant).await;
            let bucket = if classify(plan.as_ref()).is_daily_cycle() {
                ReminderBucket::DailyReminder
            } else {
                ReminderBucket::OneDay
            };
            self.process(&tenant, plan.as_ref(), bucket, now, &mut stats)
                .await;
        }

        // Expiring on the calendar day three days out, standard cadence only.
        let three_days = ExpiryWindow::day_ahead(now, THREE_DAY_LEAD_DAYS);
        for tenant in self.tenants.expiring_between(three_days).await? {
            let plan = self.resolve_plan(&tenant).await;
            if classify(plan.as_ref()).is_daily_cycle() {
                continue;
            }
            self.process(
                &tenant,
                plan.as_ref(),
                ReminderBucket::ThreeDay,
                now,
                &mut stats,
            )
            .await;
        }

        // Expired during the previous calendar day, standard cadence only.
        let yesterday = ExpiryWindow::yesterday(now);
        for tenant in self.tenants.expired_between(yesterday).await? {
            let plan = self.resolve_plan(&tenant).await;
            if classify(plan.as_ref()).is_daily_cycle() {
                continue;
            }
            self.process(
                &tenant,
                plan.as_ref(),
                ReminderBucket::Expired,
                now,
                &mut stats,
            )
            .await;
        }

        // Freshly expired daily-cycle tenants get their notice within hours,
        // not after a day boundary.
        let lookback = ExpiryWindow::hours_back(now, DAILY_EXPIRED_LOOKBACK_HOURS);
        for tenant in self.tenants.expired_between(lookback).await? {
            let plan = self.resolve_plan(&tenant).await;
            if !classify(plan.as_ref()).is_daily_cycle() {
                continue;
            }
            self.process(
                &tenant,
                plan.as_ref(),
                ReminderBucket::DailyExpired,
                now,
                &mut stats,
            )
            .await;
        }

        if stats.sent() > 0 || stats.errors > 0 {
            info!(
                sent = stats.sent(),
                skipped = stats.skipped_dedup,
                renewals = stats.renewal_payments,
                errors = stats.errors,
                "expiration reminder tick finished"
            );
        }
        Ok(stats)
    }

    /// Resolves the tenant's plan; a lookup failure logs and classifies as
    /// standard cadence downstream.
    async fn resolve_plan(&self, tenant: &Tenant) -> Option<Plan> {
        let plan_id = tenant.plan_id?;
        match self.plans.find_by_id(&plan_id).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(tenant = %tenant.id, error = %e, "plan lookup failed");
                None
            }
        }
    }

    async fn process(
        &self,
        tenant: &Tenant,
        plan: Option<&Plan>,
        bucket: ReminderBucket,
        now: Timestamp,
        stats: &mut ReminderStats,
    ) {
        match self.process_one(tenant, plan, bucket, now).await {
            Ok(Outcome::Skipped) => stats.skipped_dedup += 1,
            Ok(Outcome::Sent { renewal_generated }) => {
                match bucket {
                    ReminderBucket::ThreeDay => stats.three_day += 1,
                    ReminderBucket::OneDay => stats.one_day += 1,
                    ReminderBucket::Expired => stats.expired += 1,
                    ReminderBucket::DailyReminder => stats.daily_reminder += 1,
                    ReminderBucket::DailyExpired => stats.daily_expired += 1,
                }
                if renewal_generated {
                    stats.renewal_payments += 1;
                }
            }
            Err(e) => {
                stats.errors += 1;
                warn!(tenant = %tenant.id, error = %e, "reminder processing failed");
            }
        }
    }

    async fn process_one(
        &self,
        tenant: &Tenant,
        plan: Option<&Plan>,
        bucket: ReminderBucket,
        now: Timestamp,
    ) -> Result<Outcome, DomainError> {
        if !bucket.should_send(tenant.last_reminder_sent_at, now) {
            return Ok(Outcome::Skipped);
        }

        let expires_at = tenant.access_expires_at.unwrap_or(now);
        let urgent = bucket == ReminderBucket::DailyReminder
            && expires_at.is_before(&now.plus_hours(DAILY_FINAL_LEAD_HOURS));

        let text = messages::reminder_text(bucket, expires_at, urgent);
        self.dispatcher
            .send(tenant.phone.as_deref(), &text, bucket.notification_kind())
            .await?;

        let email = OutboundEmail {
            to: tenant.email.clone(),
            subject: messages::reminder_subject(bucket).to_string(),
            html: messages::reminder_email_html(bucket, expires_at, urgent),
        };
        if let Err(e) = self.email.send(email).await {
            warn!(tenant = %tenant.id, error = %e, "reminder email failed");
        }

        let mut renewal_generated = false;
        if bucket.triggers_renewal_payment() {
            if let Some(plan) = plan {
                if let Some(record) = self.renewal.generate(tenant, plan).await? {
                    renewal_generated = true;
                    if let Some(pix_text) = messages::renewal_pix_text(&record) {
                        self.dispatcher
                            .send(
                                tenant.phone.as_deref(),
                                &pix_text,
                                NotificationKind::RenewalPayment,
                            )
                            .await?;
                    }
                }
            }
        }

        self.tenants.record_reminder_sent(&tenant.id, now).await?;
        Ok(Outcome::Sent { renewal_generated })
    }
}
