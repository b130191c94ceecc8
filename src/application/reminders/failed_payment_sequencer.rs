//! Failed-recurring-payment reminder ladder.
//!
//! A rejected recurring charge gets up to three escalating reminders, at one,
//! three, and seven days after the failure. Each step additionally requires a
//! 23-hour cooldown since the previous reminder so an hourly scheduler never
//! fires two steps in one day.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::dispatch::NotificationDispatcher;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::payment::PaymentRecord;
use crate::ports::{EmailSender, OutboundEmail, PaymentRepository, TenantRepository};

use super::messages;

/// Days after the failure at which each ladder step fires.
pub const FAILURE_LADDER_DAYS: [i64; 3] = [1, 3, 7];

/// Minimum gap between two ladder steps.
pub const FAILURE_REMINDER_COOLDOWN_HOURS: i64 = 23;

/// Outcome counters for one sequencer pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequencerStats {
    pub scanned: u32,
    pub sent: u32,
    pub not_due: u32,
    pub errors: u32,
}

/// Walks rejected recurring payments through the reminder ladder.
pub struct FailedPaymentSequencer {
    payments: Arc<dyn PaymentRepository>,
    tenants: Arc<dyn TenantRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    email: Arc<dyn EmailSender>,
    checkout_url: String,
}

impl FailedPaymentSequencer {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        tenants: Arc<dyn TenantRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        email: Arc<dyn EmailSender>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            payments,
            tenants,
            dispatcher,
            email,
            checkout_url: checkout_url.into(),
        }
    }

    /// Runs one ladder pass.
    pub async fn run(&self) -> Result<SequencerStats, DomainError> {
        self.run_at(Timestamp::now()).await
    }

    /// Ladder pass against an explicit clock reading.
    pub async fn run_at(&self, now: Timestamp) -> Result<SequencerStats, DomainError> {
        let mut stats = SequencerStats::default();

        for mut record in self.payments.rejected_recurring().await? {
            if !record.ladder_open() {
                continue;
            }
            stats.scanned += 1;

            if !Self::step_due(&record, now) {
                stats.not_due += 1;
                continue;
            }

            match self.send_step(&mut record, now).await {
                Ok(()) => stats.sent += 1,
                Err(e) => {
                    stats.errors += 1;
                    warn!(payment = %record.id, error = %e, "failure reminder step failed");
                }
            }
        }

        if stats.sent > 0 || stats.errors > 0 {
            info!(
                scanned = stats.scanned,
                sent = stats.sent,
                errors = stats.errors,
                "failed-payment reminder pass finished"
            );
        }
        Ok(stats)
    }

    /// Whether the record's next ladder step is due at `now`.
    fn step_due(record: &PaymentRecord, now: Timestamp) -> bool {
        let failed_at = match record.failed_at {
            Some(t) => t,
            None => return false,
        };
        let due_day = match FAILURE_LADDER_DAYS.get(record.reminders_sent as usize) {
            Some(d) => *d,
            None => return false,
        };
        if now.days_since(&failed_at) < due_day {
            return false;
        }
        match record.last_failure_reminder_at {
            Some(last) => now.hours_since(&last) >= FAILURE_REMINDER_COOLDOWN_HOURS,
            None => true,
        }
    }

    async fn send_step(
        &self,
        record: &mut PaymentRecord,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let stop = record.reminders_sent + 1;
        let text = messages::failed_payment_text(stop, &self.checkout_url);

        let phone = self
            .tenants
            .find_by_email(&record.tenant_email)
            .await?
            .and_then(|t| t.phone);
        self.dispatcher
            .send(
                phone.as_deref(),
                &text,
                NotificationKind::FailedRecurringPayment,
            )
            .await?;

        let email = OutboundEmail {
            to: record.tenant_email.clone(),
            subject: messages::failed_payment_subject(stop).to_string(),
            html: format!("<p>{text}</p>"),
        };
        if let Err(e) = self.email.send(email).await {
            warn!(payment = %record.id, error = %e, "failure reminder email failed");
        }

        record.record_failure_reminder(now);
        self.payments.update(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ChannelAccountId, PaymentId, PlanId, TenantId};
    use crate::domain::notification::{
        AccountScope, ChannelAccount, ConnectionStatus, NotificationLog,
    };
    use crate::domain::tenant::{ExpiryWindow, Tenant};
    use crate::ports::{
        ChannelAccountRepository, ChannelError, EmailError, MessageChannel,
        NotificationLogRepository,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockPaymentRepository {
        records: Mutex<Vec<PaymentRecord>>,
        updated: Mutex<Vec<PaymentRecord>>,
    }

    impl MockPaymentRepository {
        fn with_records(records: Vec<PaymentRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                updated: Mutex::new(Vec::new()),
            }
        }

        fn updated(&self) -> Vec<PaymentRecord> {
            self.updated.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepository {
        async fn save(&self, record: &PaymentRecord) -> Result<(), DomainError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn update(&self, record: &PaymentRecord) -> Result<(), DomainError> {
            self.updated.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn find_by_id(&self, _id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
            Ok(None)
        }

        async fn last_approved_by_email(
            &self,
            _email: &str,
        ) -> Result<Option<PaymentRecord>, DomainError> {
            Ok(None)
        }

        async fn rejected_recurring(&self) -> Result<Vec<PaymentRecord>, DomainError> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn open_gateway_records(&self) -> Result<Vec<PaymentRecord>, DomainError> {
            Ok(Vec::new())
        }
    }

    struct MockTenantRepository;

    #[async_trait]
    impl TenantRepository for MockTenantRepository {
        async fn find_by_id(&self, _id: &TenantId) -> Result<Option<Tenant>, DomainError> {
            Ok(None)
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, DomainError> {
            Ok(Some(Tenant {
                id: TenantId::new(),
                email: email.to_string(),
                phone: Some("+5511999990000".to_string()),
                plan_id: None,
                access_expires_at: None,
                is_active: true,
                payment_standing: crate::domain::tenant::PaymentStanding::Rejected,
                last_reminder_sent_at: None,
                created_at: Timestamp::now(),
                updated_at: Timestamp::now(),
            }))
        }

        async fn update(&self, _tenant: &Tenant) -> Result<(), DomainError> {
            Ok(())
        }

        async fn record_reminder_sent(
            &self,
            _id: &TenantId,
            _at: Timestamp,
        ) -> Result<(), DomainError> {
            Ok(())
        }

        async fn expiring_between(
            &self,
            _window: ExpiryWindow,
        ) -> Result<Vec<Tenant>, DomainError> {
            Ok(Vec::new())
        }

        async fn expired_between(
            &self,
            _window: ExpiryWindow,
        ) -> Result<Vec<Tenant>, DomainError> {
            Ok(Vec::new())
        }
    }

    struct MockLogRepository {
        entries: Mutex<Vec<NotificationLog>>,
    }

    #[async_trait]
    impl NotificationLogRepository for MockLogRepository {
        async fn save(&self, entry: &NotificationLog) -> Result<(), DomainError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn update(&self, entry: &NotificationLog) -> Result<(), DomainError> {
            let mut entries = self.entries.lock().unwrap();
            if let Some(pos) = entries.iter().position(|e| e.id == entry.id) {
                entries[pos] = entry.clone();
            }
            Ok(())
        }

        async fn pending(&self, _limit: u32) -> Result<Vec<NotificationLog>, DomainError> {
            Ok(Vec::new())
        }
    }

    struct MockAccountRepository;

    #[async_trait]
    impl ChannelAccountRepository for MockAccountRepository {
        async fn connected_by_scope(
            &self,
            _scope: AccountScope,
        ) -> Result<Vec<ChannelAccount>, DomainError> {
            Ok(vec![ChannelAccount {
                id: ChannelAccountId::new(),
                name: "notify-01".to_string(),
                scope: AccountScope::Notifications,
                hourly_limit: 100,
                sent_this_hour: 0,
                connection: ConnectionStatus::Connected,
            }])
        }

        async fn increment_hourly(&self, _id: &ChannelAccountId) -> Result<(), DomainError> {
            Ok(())
        }

        async fn set_connection_status(
            &self,
            _id: &ChannelAccountId,
            _status: ConnectionStatus,
        ) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct MockChannel;

    #[async_trait]
    impl MessageChannel for MockChannel {
        async fn connection_status(
            &self,
            _account: &ChannelAccount,
        ) -> Result<ConnectionStatus, ChannelError> {
            Ok(ConnectionStatus::Connected)
        }

        async fn send_text(
            &self,
            _account: &ChannelAccount,
            _contact: &str,
            _text: &str,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    struct MockEmail;

    #[async_trait]
    impl EmailSender for MockEmail {
        async fn send(&self, _email: OutboundEmail) -> Result<(), EmailError> {
            Ok(())
        }
    }

    fn sequencer(payments: Arc<MockPaymentRepository>) -> FailedPaymentSequencer {
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(MockLogRepository {
                entries: Mutex::new(Vec::new()),
            }),
            Arc::new(MockAccountRepository),
            Arc::new(MockChannel),
            true,
        ));
        FailedPaymentSequencer::new(
            payments,
            Arc::new(MockTenantRepository),
            dispatcher,
            Arc::new(MockEmail),
            "https://pay.example.com/renew",
        )
    }

    fn rejected_record(
        failed_days_ago: i64,
        reminders_sent: u32,
        last_reminder_hours_ago: Option<i64>,
        now: Timestamp,
    ) -> PaymentRecord {
        let mut record =
            PaymentRecord::new_pending("tenant@example.com", PlanId::new(), 4990, None);
        record.reject(now.minus_days(failed_days_ago)).unwrap();
        record.reminders_sent = reminders_sent;
        record.last_failure_reminder_at = last_reminder_hours_ago.map(|h| now.minus_hours(h));
        record
    }

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_705_327_200)
    }

    #[tokio::test]
    async fn first_step_fires_one_day_after_failure() {
        let now = now();
        let payments = Arc::new(MockPaymentRepository::with_records(vec![rejected_record(
            1, 0, None, now,
        )]));
        let s = sequencer(payments.clone());

        let stats = s.run_at(now).await.unwrap();

        assert_eq!(stats.sent, 1);
        let updated = payments.updated();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].reminders_sent, 1);
        assert_eq!(updated[0].last_failure_reminder_at, Some(now));
    }

    #[tokio::test]
    async fn first_step_not_due_before_one_day() {
        let now = now();
        let payments = Arc::new(MockPaymentRepository::with_records(vec![rejected_record(
            0, 0, None, now,
        )]));
        let s = sequencer(payments.clone());

        let stats = s.run_at(now).await.unwrap();

        assert_eq!(stats.sent, 0);
        assert_eq!(stats.not_due, 1);
    }

    #[tokio::test]
    async fn second_step_waits_for_day_three() {
        let now = now();
        let payments = Arc::new(MockPaymentRepository::with_records(vec![rejected_record(
            2,
            1,
            Some(24),
            now,
        )]));
        let s = sequencer(payments);

        let stats = s.run_at(now).await.unwrap();

        assert_eq!(stats.sent, 0);
        assert_eq!(stats.not_due, 1);
    }

    #[tokio::test]
    async fn second_step_fires_on_day_three() {
        let now = now();
        let payments = Arc::new(MockPaymentRepository::with_records(vec![rejected_record(
            3,
            1,
            Some(48),
            now,
        )]));
        let s = sequencer(payments.clone());

        let stats = s.run_at(now).await.unwrap();

        assert_eq!(stats.sent, 1);
        assert_eq!(payments.updated()[0].reminders_sent, 2);
    }

    #[tokio::test]
    async fn cooldown_blocks_back_to_back_steps() {
        let now = now();
        // Day three reached but the previous reminder went out 10h ago.
        let payments = Arc::new(MockPaymentRepository::with_records(vec![rejected_record(
            3,
            1,
            Some(10),
            now,
        )]));
        let s = sequencer(payments);

        let stats = s.run_at(now).await.unwrap();

        assert_eq!(stats.sent, 0);
        assert_eq!(stats.not_due, 1);
    }

    #[tokio::test]
    async fn cooldown_passes_at_exactly_23_hours() {
        let now = now();
        let payments = Arc::new(MockPaymentRepository::with_records(vec![rejected_record(
            3,
            1,
            Some(FAILURE_REMINDER_COOLDOWN_HOURS),
            now,
        )]));
        let s = sequencer(payments);

        assert_eq!(s.run_at(now).await.unwrap().sent, 1);
    }

    #[tokio::test]
    async fn exhausted_ladder_is_ignored() {
        let now = now();
        let payments = Arc::new(MockPaymentRepository::with_records(vec![rejected_record(
            10,
            3,
            Some(72),
            now,
        )]));
        let s = sequencer(payments.clone());

        let stats = s.run_at(now).await.unwrap();

        assert_eq!(stats.scanned, 0);
        assert_eq!(stats.sent, 0);
        assert!(payments.updated().is_empty());
    }
}
