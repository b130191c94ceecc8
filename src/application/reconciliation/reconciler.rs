//! Gateway reconciler.
//!
//! Webhooks get lost; this job periodically reads gateway truth for every
//! payment record carrying a gateway reference and repairs local state.
//! Subscription references resolve to the subscription's state and its
//! approved charges; one-off references (manual PIX and boleto instruments)
//! resolve to the payment itself.
//!
//! The whole pass is idempotent. An approved charge extends access from
//! `max(current_expiry, approval_date)` by one plan cycle, but only when the
//! charge has not already been applied: without that guard a re-run would
//! stack another cycle onto the window it extended last time. Access never
//! moves earlier except through an explicit block from the gateway.

use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::payment::{GatewayKind, PaymentRecord};
use crate::domain::plan::Plan;
use crate::domain::tenant::PaymentStanding;
use crate::ports::{
    ChargeStatus, GatewayCharge, PaymentGateway, PaymentRepository, PlanRepository,
    SubscriptionState, TenantRepository,
};

/// Records reconciled concurrently per chunk.
const CHUNK_SIZE: usize = 5;

/// Pause between chunks, keeping request bursts polite to the gateways.
const CHUNK_PAUSE_MS: u64 = 250;

/// Outcome counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub scanned: u32,

    /// Tenants whose access window moved forward.
    pub extended: u32,

    /// Tenants blocked because the gateway reported the subscription
    /// paused, cancelled, or stuck pending.
    pub blocked: u32,

    /// Records whose local status was repaired to approved.
    pub repaired: u32,

    /// Manual instruments the gateway reported as declined.
    pub cancelled: u32,

    pub unchanged: u32,
    pub errors: u32,
}

enum Outcome {
    Extended,
    Blocked,
    Cancelled,
    Unchanged,
}

/// Repairs tenant access and payment records from gateway truth.
pub struct GatewayReconciler {
    tenants: Arc<dyn TenantRepository>,
    plans: Arc<dyn PlanRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateways: Vec<Arc<dyn PaymentGateway>>,
}

impl GatewayReconciler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        plans: Arc<dyn PlanRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateways: Vec<Arc<dyn PaymentGateway>>,
    ) -> Self {
        Self {
            tenants,
            plans,
            payments,
            gateways,
        }
    }

    /// Runs one reconciliation pass over all open gateway records.
    pub async fn run(&self) -> Result<ReconcileStats, DomainError> {
        let mut stats = ReconcileStats::default();

        let records = self.payments.open_gateway_records().await?;
        stats.scanned = records.len() as u32;
        if records.is_empty() {
            return Ok(stats);
        }

        let mut chunks = records.chunks(CHUNK_SIZE).peekable();
        while let Some(chunk) = chunks.next() {
            let outcomes =
                futures::future::join_all(chunk.iter().map(|r| self.reconcile_record(r.clone())))
                    .await;
            for (record, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok((outcome, repaired)) => {
                        if repaired {
                            stats.repaired += 1;
                        }
                        match outcome {
                            Outcome::Extended => stats.extended += 1,
                            Outcome::Blocked => stats.blocked += 1,
                            Outcome::Cancelled => stats.cancelled += 1,
                            Outcome::Unchanged => stats.unchanged += 1,
                        }
                    }
                    Err(e) => {
                        stats.errors += 1;
                        warn!(payment = %record.id, error = %e, "reconciliation failed for record");
                    }
                }
            }
            if chunks.peek().is_some() {
                sleep(Duration::from_millis(CHUNK_PAUSE_MS)).await;
            }
        }

        info!(
            scanned = stats.scanned,
            extended = stats.extended,
            blocked = stats.blocked,
            repaired = stats.repaired,
            errors = stats.errors,
            "reconciliation pass finished"
        );
        Ok(stats)
    }

    /// Reconciles one record. Returns the outcome and whether the record's
    /// local status was repaired.
    async fn reconcile_record(
        &self,
        mut record: PaymentRecord,
    ) -> Result<(Outcome, bool), DomainError> {
        if let Some((kind, subscription_id)) = record.gateway_refs.subscription_ref() {
            let subscription_id = subscription_id.to_string();
            return self
                .reconcile_subscription(&mut record, kind, &subscription_id)
                .await;
        }
        if let Some((kind, payment_id)) = record.gateway_refs.payment_ref() {
            let payment_id = payment_id.to_string();
            return self.reconcile_payment(&mut record, kind, &payment_id).await;
        }
        Ok((Outcome::Unchanged, false))
    }

    async fn reconcile_subscription(
        &self,
        record: &mut PaymentRecord,
        kind: GatewayKind,
        subscription_id: &str,
    ) -> Result<(Outcome, bool), DomainError> {
        let gateway = self.gateway_for(kind)?;

        let subscription = match gateway
            .fetch_subscription(subscription_id)
            .await
            .map_err(gateway_error)?
        {
            Some(s) => s,
            None => {
                debug!(payment = %record.id, "subscription no longer exists on gateway");
                return Ok((Outcome::Unchanged, false));
            }
        };

        match subscription.state {
            SubscriptionState::Active | SubscriptionState::Authorized => {
                let charges = gateway
                    .list_approved_charges(subscription_id)
                    .await
                    .map_err(gateway_error)?;
                let latest = match latest_approved(&charges) {
                    Some(c) => c,
                    None => return Ok((Outcome::Unchanged, false)),
                };

                let repaired = record.approve()?;
                if repaired {
                    self.payments.update(record).await?;
                }

                let approval = latest.approved_at.unwrap_or_else(Timestamp::now);
                let extended = self.apply_approval(record, approval).await?;
                if extended {
                    Ok((Outcome::Extended, repaired))
                } else {
                    Ok((Outcome::Unchanged, repaired))
                }
            }
            SubscriptionState::Paused => self.block_tenant(record, PaymentStanding::Paused).await,
            SubscriptionState::Cancelled => {
                self.block_tenant(record, PaymentStanding::Cancelled).await
            }
            SubscriptionState::Pending => self.block_tenant(record, PaymentStanding::Pending).await,
            SubscriptionState::Unknown => Ok((Outcome::Unchanged, false)),
        }
    }

    async fn reconcile_payment(
        &self,
        record: &mut PaymentRecord,
        kind: GatewayKind,
        payment_id: &str,
    ) -> Result<(Outcome, bool), DomainError> {
        let gateway = self.gateway_for(kind)?;

        let payment = match gateway
            .fetch_payment(payment_id)
            .await
            .map_err(gateway_error)?
        {
            Some(p) => p,
            None => return Ok((Outcome::Unchanged, false)),
        };

        match payment.status {
            ChargeStatus::Approved => {
                let repaired = record.approve()?;
                if repaired {
                    self.payments.update(record).await?;
                }
                let approval = payment.approved_at.unwrap_or_else(Timestamp::now);
                let extended = self.apply_approval(record, approval).await?;
                if extended {
                    Ok((Outcome::Extended, repaired))
                } else {
                    Ok((Outcome::Unchanged, repaired))
                }
            }
            ChargeStatus::Rejected => {
                if record.status.is_terminal() {
                    return Ok((Outcome::Unchanged, false));
                }
                record.cancel()?;
                self.payments.update(record).await?;
                Ok((Outcome::Cancelled, false))
            }
            ChargeStatus::Pending => Ok((Outcome::Unchanged, false)),
        }
    }

    /// Applies an approved charge to the tenant's access window.
    ///
    /// Returns whether the tenant row was written. The no-op path still
    /// repairs standing and activity through `extend_access` so a tenant
    /// blocked by a stale read recovers even when the window is current.
    async fn apply_approval(
        &self,
        record: &PaymentRecord,
        approval: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut tenant = match self.tenants.find_by_email(&record.tenant_email).await? {
            Some(t) => t,
            None => {
                warn!(payment = %record.id, "no tenant for reconciled payment");
                return Ok(false);
            }
        };
        let plan = match self.plans.find_by_id(&record.plan_id).await? {
            Some(p) => p,
            None => {
                warn!(payment = %record.id, "no plan for reconciled payment");
                return Ok(false);
            }
        };

        let changed = match renewal_expiry(tenant.access_expires_at, approval, &plan) {
            Some(new_expiry) => tenant.extend_access(new_expiry),
            // Charge already applied; only standing or activity may change.
            None => match tenant.access_expires_at {
                Some(current) => tenant.extend_access(current),
                None => false,
            },
        };

        if changed {
            self.tenants.update(&tenant).await?;
        }
        Ok(changed)
    }

    async fn block_tenant(
        &self,
        record: &PaymentRecord,
        standing: PaymentStanding,
    ) -> Result<(Outcome, bool), DomainError> {
        let mut tenant = match self.tenants.find_by_email(&record.tenant_email).await? {
            Some(t) => t,
            None => return Ok((Outcome::Unchanged, false)),
        };

        if tenant.block_access(standing, Timestamp::now()) {
            self.tenants.update(&tenant).await?;
            Ok((Outcome::Blocked, false))
        } else {
            Ok((Outcome::Unchanged, false))
        }
    }

    fn gateway_for(&self, kind: GatewayKind) -> Result<&Arc<dyn PaymentGateway>, DomainError> {
        self.gateways
            .iter()
            .find(|g| g.kind() == kind)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ConfigurationMissing,
                    format!("no gateway configured for {}", kind.as_str()),
                )
            })
    }
}

/// Computes the renewed expiry for an approved charge, or `None` when the
/// charge is already reflected in the current window.
///
/// The extension base is `max(current_expiry, approval)`, so an early manual
/// renewal stacks onto remaining access instead of truncating it. The
/// already-applied check keeps repeated passes over the same charge from
/// stacking a cycle each time.
fn renewal_expiry(current: Option<Timestamp>, approval: Timestamp, plan: &Plan) -> Option<Timestamp> {
    let floor = plan.expiration_from(approval);
    match current {
        Some(c) if !c.is_before(&floor) => None,
        Some(c) => {
            let base = if c.is_after(&approval) { c } else { approval };
            Some(plan.expiration_from(base))
        }
        None => Some(floor),
    }
}

/// Picks the most recently approved charge.
fn latest_approved(charges: &[GatewayCharge]) -> Option<&GatewayCharge> {
    charges
        .iter()
        .filter(|c| c.status == ChargeStatus::Approved)
        .max_by_key(|c| c.approved_at.map(|t| t.as_unix_secs()))
}

fn gateway_error(e: crate::ports::GatewayError) -> DomainError {
    DomainError::new(ErrorCode::GatewayError, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PaymentId, PlanId, TenantId};
    use crate::domain::payment::{BoletoArtifact, GatewayRefs, PixArtifact};
    use crate::domain::plan::{BillingMode, CycleUnit};
    use crate::domain::tenant::{ExpiryWindow, Tenant};
    use crate::ports::{
        CreateBoletoRequest, CreatePixRequest, GatewayError, GatewayPayment, GatewaySubscription,
    };
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn plan_30d() -> Plan {
        Plan {
            id: PlanId::new(),
            name: "Monthly".to_string(),
            billing_mode: BillingMode::Recurring,
            cycle_length: 1,
            cycle_unit: CycleUnit::Months,
            price_cents: 4990,
        }
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs)
    }

    #[test]
    fn renewal_extends_from_later_of_expiry_and_approval() {
        let plan = plan_30d();
        let day = 86_400;

        // Approval after expiry: base is the approval.
        let expiry = ts(100 * day);
        let approval = ts(110 * day);
        assert_eq!(
            renewal_expiry(Some(expiry), approval, &plan),
            Some(ts(140 * day))
        );

        // Approval before expiry (early renewal): base is the expiry.
        let approval = ts(95 * day);
        assert_eq!(
            renewal_expiry(Some(expiry), approval, &plan),
            Some(ts(130 * day))
        );
    }

    #[test]
    fn renewal_already_applied_returns_none() {
        let plan = plan_30d();
        let day = 86_400;
        let approval = ts(100 * day);
        // Expiry already covers approval + cycle.
        assert_eq!(renewal_expiry(Some(ts(130 * day)), approval, &plan), None);
        assert_eq!(renewal_expiry(Some(ts(140 * day)), approval, &plan), None);
    }

    #[test]
    fn renewal_grants_first_window() {
        let plan = plan_30d();
        let approval = ts(86_400);
        assert_eq!(
            renewal_expiry(None, approval, &plan),
            Some(approval.plus_days(30))
        );
    }

    proptest! {
        // Extension never moves the window backward, and re-applying the
        // same approval converges after one extension.
        #[test]
        fn renewal_is_monotonic_and_convergent(
            current_secs in 0i64..4_000_000_000,
            approval_secs in 0i64..4_000_000_000,
        ) {
            let plan = plan_30d();
            let current = ts(current_secs);
            let approval = ts(approval_secs);

            match renewal_expiry(Some(current), approval, &plan) {
                Some(new_expiry) => {
                    prop_assert!(new_expiry.is_after(&current));
                    // Second application of the same charge is a no-op.
                    prop_assert_eq!(renewal_expiry(Some(new_expiry), approval, &plan), None);
                }
                None => {
                    // Only possible when the window already covers the charge.
                    prop_assert!(!current.is_before(&plan.expiration_from(approval)));
                }
            }
        }
    }

    struct MockTenantRepository {
        tenants: Mutex<Vec<Tenant>>,
        updates: Mutex<u32>,
    }

    impl MockTenantRepository {
        fn with_tenant(tenant: Tenant) -> Self {
            Self {
                tenants: Mutex::new(vec![tenant]),
                updates: Mutex::new(0),
            }
        }

        fn update_count(&self) -> u32 {
            *self.updates.lock().unwrap()
        }

        fn tenant(&self) -> Tenant {
            self.tenants.lock().unwrap()[0].clone()
        }
    }

    #[async_trait]
    impl TenantRepository for MockTenantRepository {
        async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
            Ok(self
                .tenants
                .lock()
                .unwrap()
                .iter()
                .find(|t| &t.id == id)
                .cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, DomainError> {
            Ok(self
                .tenants
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.email == email)
                .cloned())
        }

        async fn update(&self, tenant: &Tenant) -> Result<(), DomainError> {
            *self.updates.lock().unwrap() += 1;
            let mut tenants = self.tenants.lock().unwrap();
            if let Some(pos) = tenants.iter().position(|t| t.id == tenant.id) {
                tenants[pos] = tenant.clone();
            }
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

    struct MockPlanRepository {
        plan: Plan,
    }

    #[async_trait]
    impl PlanRepository for MockPlanRepository {
        async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
            Ok((&self.plan.id == id).then(|| self.plan.clone()))
        }
    }

    struct MockPaymentRepository {
        records: Mutex<Vec<PaymentRecord>>,
        updates: Mutex<Vec<PaymentRecord>>,
    }

    impl MockPaymentRepository {
        fn with_records(records: Vec<PaymentRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                updates: Mutex::new(Vec::new()),
            }
        }

        fn updates(&self) -> Vec<PaymentRecord> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepository {
        async fn save(&self, record: &PaymentRecord) -> Result<(), DomainError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn update(&self, record: &PaymentRecord) -> Result<(), DomainError> {
            self.updates.lock().unwrap().push(record.clone());
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
            Ok(Vec::new())
        }

        async fn open_gateway_records(&self) -> Result<Vec<PaymentRecord>, DomainError> {
            Ok(self.records.lock().unwrap().clone())
        }
    }

    struct MockGateway {
        kind: GatewayKind,
        subscription: Option<GatewaySubscription>,
        charges: Vec<GatewayCharge>,
        payment: Option<GatewayPayment>,
    }

    impl MockGateway {
        fn subscription(state: SubscriptionState, charges: Vec<GatewayCharge>) -> Self {
            Self {
                kind: GatewayKind::MercadoPago,
                subscription: Some(GatewaySubscription {
                    id: "sub-1".to_string(),
                    payer_email: "tenant@example.com".to_string(),
                    state,
                }),
                charges,
                payment: None,
            }
        }

        fn one_off(payment: GatewayPayment) -> Self {
            Self {
                kind: GatewayKind::MercadoPago,
                subscription: None,
                charges: Vec::new(),
                payment: Some(payment),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        fn kind(&self) -> GatewayKind {
            self.kind
        }

        async fn create_pix_payment(
            &self,
            _request: CreatePixRequest,
        ) -> Result<(String, PixArtifact), GatewayError> {
            Err(GatewayError::provider("not under test"))
        }

        async fn create_boleto_payment(
            &self,
            _request: CreateBoletoRequest,
        ) -> Result<(String, BoletoArtifact), GatewayError> {
            Err(GatewayError::provider("not under test"))
        }

        async fn find_subscription_by_email(
            &self,
            _email: &str,
        ) -> Result<Option<GatewaySubscription>, GatewayError> {
            Ok(None)
        }

        async fn fetch_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<Option<GatewaySubscription>, GatewayError> {
            Ok(self.subscription.clone())
        }

        async fn list_approved_charges(
            &self,
            _subscription_id: &str,
        ) -> Result<Vec<GatewayCharge>, GatewayError> {
            Ok(self.charges.clone())
        }

        async fn fetch_payment(
            &self,
            _payment_id: &str,
        ) -> Result<Option<GatewayPayment>, GatewayError> {
            Ok(self.payment.clone())
        }
    }

    fn tenant(plan_id: PlanId, expiry: Option<Timestamp>) -> Tenant {
        Tenant {
            id: TenantId::new(),
            email: "tenant@example.com".to_string(),
            phone: None,
            plan_id: Some(plan_id),
            access_expires_at: expiry,
            is_active: true,
            payment_standing: PaymentStanding::Ok,
            last_reminder_sent_at: None,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    fn subscription_record(plan_id: PlanId) -> PaymentRecord {
        let mut record = PaymentRecord::new_pending("tenant@example.com", plan_id, 4990, None);
        record.gateway_refs = GatewayRefs {
            mercado_pago_subscription_id: Some("sub-1".to_string()),
            ..Default::default()
        };
        record
    }

    fn approved_charge(approved_at: Timestamp) -> GatewayCharge {
        GatewayCharge {
            id: "charge-1".to_string(),
            status: ChargeStatus::Approved,
            approved_at: Some(approved_at),
            amount_cents: 4990,
        }
    }

    fn reconciler(
        tenants: Arc<MockTenantRepository>,
        plan: Plan,
        payments: Arc<MockPaymentRepository>,
        gateway: MockGateway,
    ) -> GatewayReconciler {
        GatewayReconciler::new(
            tenants,
            Arc::new(MockPlanRepository { plan }),
            payments,
            vec![Arc::new(gateway)],
        )
    }

    #[tokio::test]
    async fn approved_charge_extends_access_and_repairs_record() {
        let plan = plan_30d();
        let expiry = Timestamp::now().minus_days(2);
        let approval = Timestamp::now().minus_hours(3);
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(
            plan.id,
            Some(expiry),
        )));
        let payments = Arc::new(MockPaymentRepository::with_records(vec![
            subscription_record(plan.id),
        ]));
        let gateway = MockGateway::subscription(
            SubscriptionState::Active,
            vec![approved_charge(approval)],
        );
        let r = reconciler(tenants.clone(), plan, payments.clone(), gateway);

        let stats = r.run().await.unwrap();

        assert_eq!(stats.extended, 1);
        assert_eq!(stats.repaired, 1);
        // Expiry was in the past, so the charge extends from its approval.
        assert_eq!(
            tenants.tenant().access_expires_at,
            Some(approval.plus_days(30))
        );
        assert_eq!(
            payments.updates()[0].status,
            crate::domain::payment::PaymentStatus::Approved
        );
    }

    #[tokio::test]
    async fn second_pass_over_same_charge_changes_nothing() {
        let plan = plan_30d();
        let approval = Timestamp::now().minus_hours(3);
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(plan.id, None)));
        let payments = Arc::new(MockPaymentRepository::with_records(vec![
            subscription_record(plan.id),
        ]));
        let gateway = MockGateway::subscription(
            SubscriptionState::Active,
            vec![approved_charge(approval)],
        );
        let r = reconciler(tenants.clone(), plan, payments, gateway);

        let first = r.run().await.unwrap();
        assert_eq!(first.extended, 1);
        let updates_after_first = tenants.update_count();

        let second = r.run().await.unwrap();
        assert_eq!(second.extended, 0);
        assert_eq!(second.unchanged, 1);
        // No second tenant write for the same gateway snapshot.
        assert_eq!(tenants.update_count(), updates_after_first);
    }

    #[tokio::test]
    async fn paused_subscription_blocks_access() {
        let plan = plan_30d();
        let future_expiry = Timestamp::now().plus_days(10);
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(
            plan.id,
            Some(future_expiry),
        )));
        let payments = Arc::new(MockPaymentRepository::with_records(vec![
            subscription_record(plan.id),
        ]));
        let gateway = MockGateway::subscription(SubscriptionState::Paused, Vec::new());
        let r = reconciler(tenants.clone(), plan, payments, gateway);

        let stats = r.run().await.unwrap();

        assert_eq!(stats.blocked, 1);
        let t = tenants.tenant();
        assert_eq!(t.payment_standing, PaymentStanding::Paused);
        assert!(t.access_expires_at.unwrap().is_before(&future_expiry));
        // Login stays possible for the renewal screen.
        assert!(t.is_active);
    }

    #[tokio::test]
    async fn cancelled_subscription_sets_cancelled_standing() {
        let plan = plan_30d();
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(
            plan.id,
            Some(Timestamp::now().plus_days(5)),
        )));
        let payments = Arc::new(MockPaymentRepository::with_records(vec![
            subscription_record(plan.id),
        ]));
        let gateway = MockGateway::subscription(SubscriptionState::Cancelled, Vec::new());
        let r = reconciler(tenants.clone(), plan, payments, gateway);

        let stats = r.run().await.unwrap();

        assert_eq!(stats.blocked, 1);
        assert_eq!(tenants.tenant().payment_standing, PaymentStanding::Cancelled);
    }

    #[tokio::test]
    async fn active_subscription_without_charges_is_unchanged() {
        let plan = plan_30d();
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(plan.id, None)));
        let payments = Arc::new(MockPaymentRepository::with_records(vec![
            subscription_record(plan.id),
        ]));
        let gateway = MockGateway::subscription(SubscriptionState::Active, Vec::new());
        let r = reconciler(tenants.clone(), plan, payments, gateway);

        let stats = r.run().await.unwrap();

        assert_eq!(stats.unchanged, 1);
        assert_eq!(tenants.update_count(), 0);
    }

    #[tokio::test]
    async fn approved_one_off_payment_recovers_missed_webhook() {
        let plan = plan_30d();
        let approval = Timestamp::now().minus_hours(1);
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(plan.id, None)));
        let mut record = PaymentRecord::new_pending("tenant@example.com", plan.id, 4990, None);
        record.gateway_refs.mercado_pago_payment_id = Some("mp-pay-1".to_string());
        let payments = Arc::new(MockPaymentRepository::with_records(vec![record]));
        let gateway = MockGateway::one_off(GatewayPayment {
            id: "mp-pay-1".to_string(),
            status: ChargeStatus::Approved,
            approved_at: Some(approval),
        });
        let r = reconciler(tenants.clone(), plan, payments.clone(), gateway);

        let stats = r.run().await.unwrap();

        assert_eq!(stats.extended, 1);
        assert_eq!(stats.repaired, 1);
        assert_eq!(
            tenants.tenant().access_expires_at,
            Some(approval.plus_days(30))
        );
    }

    #[tokio::test]
    async fn rejected_one_off_payment_is_cancelled_locally() {
        let plan = plan_30d();
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(plan.id, None)));
        let mut record = PaymentRecord::new_pending("tenant@example.com", plan.id, 4990, None);
        record.gateway_refs.mercado_pago_payment_id = Some("mp-pay-1".to_string());
        let payments = Arc::new(MockPaymentRepository::with_records(vec![record]));
        let gateway = MockGateway::one_off(GatewayPayment {
            id: "mp-pay-1".to_string(),
            status: ChargeStatus::Rejected,
            approved_at: None,
        });
        let r = reconciler(tenants.clone(), plan, payments.clone(), gateway);

        let stats = r.run().await.unwrap();

        assert_eq!(stats.cancelled, 1);
        assert_eq!(
            payments.updates()[0].status,
            crate::domain::payment::PaymentStatus::Cancelled
        );
        assert_eq!(tenants.update_count(), 0);
    }

    #[tokio::test]
    async fn missing_gateway_is_an_isolated_error() {
        let plan = plan_30d();
        let tenants = Arc::new(MockTenantRepository::with_tenant(tenant(plan.id, None)));
        let mut asaas_record = PaymentRecord::new_pending("tenant@example.com", plan.id, 990, None);
        asaas_record.gateway_refs.asaas_subscription_id = Some("as-sub-1".to_string());
        let payments = Arc::new(MockPaymentRepository::with_records(vec![asaas_record]));
        // Only Mercado Pago is configured.
        let gateway = MockGateway::subscription(SubscriptionState::Active, Vec::new());
        let r = reconciler(tenants, plan, payments, gateway);

        let stats = r.run().await.unwrap();

        assert_eq!(stats.errors, 1);
    }
}
