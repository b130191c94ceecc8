//! Renewal payment generation.
//!
//! When a reminder bucket calls for it, this generator produces manual
//! payment instruments (PIX, and boleto when a tax document is on file) for
//! one more plan cycle and emails them to the tenant. Generation is skipped
//! when any gateway still holds an open recurring subscription for the
//! tenant, since that subscription will bill on its own and a manual
//! instrument would double-charge.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentRecord;
use crate::domain::plan::{classify, Plan};
use crate::domain::tenant::Tenant;
use crate::ports::{
    CreateBoletoRequest, CreatePixRequest, EmailSender, OutboundEmail, PaymentGateway,
    PaymentRepository,
};

use super::messages;

/// PIX instruments expire after this many minutes.
pub const PIX_LIFETIME_MINUTES: i64 = 30;

/// Boleto vouchers fall due this many days after issue.
pub const BOLETO_DUE_DAYS: i64 = 3;

/// Generates manual renewal instruments and the renewal email.
pub struct RenewalPaymentGenerator {
    payments: Arc<dyn PaymentRepository>,

    /// Gateways in priority order; the first one creates instruments, all of
    /// them are checked for competing subscriptions.
    gateways: Vec<Arc<dyn PaymentGateway>>,

    email: Arc<dyn EmailSender>,
    checkout_url: String,
}

impl RenewalPaymentGenerator {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateways: Vec<Arc<dyn PaymentGateway>>,
        email: Arc<dyn EmailSender>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            payments,
            gateways,
            email,
            checkout_url: checkout_url.into(),
        }
    }

    /// Generates a renewal payment record for one cycle of `plan`.
    ///
    /// Returns `Ok(None)` when generation was skipped because an open
    /// recurring subscription already covers the tenant. The returned record
    /// is persisted; instrument failures degrade to a checkout-link email
    /// rather than failing the whole operation.
    pub async fn generate(
        &self,
        tenant: &Tenant,
        plan: &Plan,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        if self.has_open_subscription(&tenant.email).await {
            info!(
                tenant = %tenant.id,
                "open recurring subscription found, skipping manual renewal instruments"
            );
            return Ok(None);
        }

        let document = self.recover_document(&tenant.email).await?;

        let mut record = PaymentRecord::new_pending(
            tenant.email.clone(),
            plan.id,
            plan.price_cents,
            document.clone(),
        );
        // Persisted before talking to the gateway so a crash mid-generation
        // leaves a traceable record.
        self.payments.save(&record).await?;

        let description = format!("Subscription renewal - {}", plan.name);

        if let Some(gateway) = self.gateways.first() {
            let pix_request = CreatePixRequest {
                payer_email: tenant.email.clone(),
                amount_cents: plan.price_cents,
                description: description.clone(),
                expires_in_minutes: PIX_LIFETIME_MINUTES,
                idempotency_key: record.id.to_string(),
            };
            match gateway.create_pix_payment(pix_request).await {
                Ok((payment_id, pix)) => {
                    record.attach_pix(gateway.kind(), payment_id, pix);
                }
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "PIX generation failed");
                }
            }

            // A multi-day voucher makes no sense for a cycle shorter than
            // its due date.
            let boleto_fits = !classify(Some(plan)).is_daily_cycle();
            if let (Some(doc), true) = (&document, boleto_fits) {
                let boleto_request = CreateBoletoRequest {
                    payer_email: tenant.email.clone(),
                    amount_cents: plan.price_cents,
                    description,
                    document: doc.clone(),
                    due_in_days: BOLETO_DUE_DAYS,
                    idempotency_key: format!("{}-boleto", record.id),
                };
                match gateway.create_boleto_payment(boleto_request).await {
                    Ok((payment_id, boleto)) => {
                        record.attach_boleto(gateway.kind(), payment_id, boleto);
                    }
                    Err(e) => {
                        warn!(tenant = %tenant.id, error = %e, "boleto generation failed");
                    }
                }
            }
        }

        self.payments.update(&record).await?;

        // The email always goes out; without instruments it carries the
        // checkout link instead.
        let email = OutboundEmail {
            to: tenant.email.clone(),
            subject: "Renew your subscription".to_string(),
            html: messages::renewal_email_html(&record, &self.checkout_url),
        };
        if let Err(e) = self.email.send(email).await {
            warn!(tenant = %tenant.id, error = %e, "renewal email failed");
        }

        Ok(Some(record))
    }

    /// Checks every gateway for a recurring subscription that will still
    /// bill on its own.
    async fn has_open_subscription(&self, email: &str) -> bool {
        for gateway in &self.gateways {
            match gateway.find_subscription_by_email(email).await {
                Ok(Some(sub)) if sub.state.is_open() => return true,
                Ok(_) => {}
                Err(e) => {
                    // A failed lookup does not block the manual path; the
                    // instrument only charges if the tenant pays it.
                    warn!(error = %e, "subscription lookup failed during competing check");
                }
            }
        }
        false
    }

    /// Recovers a usable tax document from the tenant's most recent approved
    /// payment.
    async fn recover_document(&self, email: &str) -> Result<Option<String>, DomainError> {
        let last = self.payments.last_approved_by_email(email).await?;
        let document = last
            .and_then(|r| r.document)
            .map(|d| normalize_document(&d))
            .filter(|d| valid_document(d));
        if document.is_none() {
            debug!(email, "no stored tax document, boleto unavailable");
        }
        Ok(document)
    }
}

/// Strips formatting from a CPF/CNPJ, keeping digits only.
fn normalize_document(document: &str) -> String {
    document.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A valid tax document has 11 digits (CPF) or 14 (CNPJ).
fn valid_document(document: &str) -> bool {
    matches!(document.len(), 11 | 14)
}
