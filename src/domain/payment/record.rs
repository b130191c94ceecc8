//! Payment record aggregate.
//!
//! A PaymentRecord tracks one billing attempt for a tenant: either a manual
//! renewal instrument (PIX and/or boleto) generated by this system, or a
//! recurring gateway charge mirrored locally. Records become terminal once
//! approved or cancelled; the reconciler repairs records whose webhook
//! events were missed.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, PlanId, Timestamp};

/// Ladder stops after this many failed-payment reminders.
pub const MAX_FAILURE_REMINDERS: u32 = 3;

/// Which payment gateway owns a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    MercadoPago,
    Asaas,
}

impl GatewayKind {
    /// Stable string form for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::MercadoPago => "mercado_pago",
            GatewayKind::Asaas => "asaas",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mercado_pago" => Some(GatewayKind::MercadoPago),
            "asaas" => Some(GatewayKind::Asaas),
            _ => None,
        }
    }
}

/// Gateway-specific subscription and payment identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefs {
    pub mercado_pago_payment_id: Option<String>,
    pub mercado_pago_subscription_id: Option<String>,
    pub asaas_payment_id: Option<String>,
    pub asaas_subscription_id: Option<String>,
}

impl GatewayRefs {
    /// The recurring-subscription reference, if the record has one.
    pub fn subscription_ref(&self) -> Option<(GatewayKind, &str)> {
        if let Some(id) = self.mercado_pago_subscription_id.as_deref() {
            return Some((GatewayKind::MercadoPago, id));
        }
        self.asaas_subscription_id
            .as_deref()
            .map(|id| (GatewayKind::Asaas, id))
    }

    /// The one-off payment reference, if the record has one.
    pub fn payment_ref(&self) -> Option<(GatewayKind, &str)> {
        if let Some(id) = self.mercado_pago_payment_id.as_deref() {
            return Some((GatewayKind::MercadoPago, id));
        }
        self.asaas_payment_id
            .as_deref()
            .map(|id| (GatewayKind::Asaas, id))
    }

    /// Whether the record carries no gateway reference at all.
    pub fn is_empty(&self) -> bool {
        self.subscription_ref().is_none() && self.payment_ref().is_none()
    }
}

/// PIX instant-transfer artifact returned by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixArtifact {
    /// Copy-paste PIX code.
    pub code: String,

    /// Base64 QR image for display.
    pub qr_base64: String,

    /// When the instrument stops being payable.
    pub expires_at: Timestamp,
}

/// Boleto voucher artifact returned by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoletoArtifact {
    /// Digitable line code.
    pub line_code: String,

    /// Hosted voucher URL.
    pub url: String,

    /// Due date of the voucher.
    pub due_at: Timestamp,
}

/// Status of a payment record. Terminal once approved or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    /// Whether the record can still change status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Cancelled)
    }

    /// Stable string form for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "approved" => Some(PaymentStatus::Approved),
            "rejected" => Some(PaymentStatus::Rejected),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

/// One billing attempt for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub tenant_email: String,
    pub plan_id: PlanId,
    pub status: PaymentStatus,
    pub gateway_refs: GatewayRefs,
    pub amount_cents: i64,

    /// Tax/document identifier (CPF/CNPJ) used for boleto generation.
    pub document: Option<String>,

    pub pix: Option<PixArtifact>,
    pub boleto: Option<BoletoArtifact>,

    /// When the most recent recurring charge failed.
    pub failed_at: Option<Timestamp>,

    /// Last time a failed-payment reminder was sent for this record.
    pub last_failure_reminder_at: Option<Timestamp>,

    /// Failed-payment reminders sent so far (ladder stops at 3).
    pub reminders_sent: u32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentRecord {
    /// Creates a new pending record for a manual renewal instrument.
    pub fn new_pending(
        tenant_email: impl Into<String>,
        plan_id: PlanId,
        amount_cents: i64,
        document: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: PaymentId::new(),
            tenant_email: tenant_email.into(),
            plan_id,
            status: PaymentStatus::Pending,
            gateway_refs: GatewayRefs::default(),
            amount_cents,
            document,
            pix: None,
            boleto: None,
            failed_at: None,
            last_failure_reminder_at: None,
            reminders_sent: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the record approved.
    ///
    /// Allowed from pending or rejected (a retried recurring charge can
    /// succeed after a failure). Approving an approved record is a no-op so
    /// duplicate gateway reads converge.
    pub fn approve(&mut self) -> Result<bool, DomainError> {
        match self.status {
            PaymentStatus::Approved => Ok(false),
            PaymentStatus::Pending | PaymentStatus::Rejected => {
                self.status = PaymentStatus::Approved;
                self.updated_at = Timestamp::now();
                Ok(true)
            }
            PaymentStatus::Cancelled => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Cannot approve a cancelled payment",
            )),
        }
    }

    /// Marks the record rejected, recording the failure time for the
    /// reminder ladder.
    pub fn reject(&mut self, failed_at: Timestamp) -> Result<bool, DomainError> {
        match self.status {
            PaymentStatus::Rejected => Ok(false),
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Rejected;
                self.failed_at = Some(failed_at);
                self.updated_at = Timestamp::now();
                Ok(true)
            }
            _ => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot reject a {} payment", self.status.as_str()),
            )),
        }
    }

    /// Marks the record cancelled.
    pub fn cancel(&mut self) -> Result<bool, DomainError> {
        match self.status {
            PaymentStatus::Cancelled => Ok(false),
            PaymentStatus::Pending | PaymentStatus::Rejected => {
                self.status = PaymentStatus::Cancelled;
                self.updated_at = Timestamp::now();
                Ok(true)
            }
            PaymentStatus::Approved => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Cannot cancel an approved payment",
            )),
        }
    }

    /// Stores a generated PIX artifact and its gateway reference.
    pub fn attach_pix(&mut self, gateway: GatewayKind, payment_id: String, pix: PixArtifact) {
        match gateway {
            GatewayKind::MercadoPago => {
                self.gateway_refs.mercado_pago_payment_id = Some(payment_id)
            }
            GatewayKind::Asaas => self.gateway_refs.asaas_payment_id = Some(payment_id),
        }
        self.pix = Some(pix);
        self.updated_at = Timestamp::now();
    }

    /// Stores a generated boleto artifact and its gateway reference.
    pub fn attach_boleto(
        &mut self,
        gateway: GatewayKind,
        payment_id: String,
        boleto: BoletoArtifact,
    ) {
        match gateway {
            GatewayKind::MercadoPago => {
                self.gateway_refs.mercado_pago_payment_id = Some(payment_id)
            }
            GatewayKind::Asaas => self.gateway_refs.asaas_payment_id = Some(payment_id),
        }
        self.boleto = Some(boleto);
        self.updated_at = Timestamp::now();
    }

    /// Records one failed-payment reminder sent at `now`.
    pub fn record_failure_reminder(&mut self, now: Timestamp) {
        self.reminders_sent += 1;
        self.last_failure_reminder_at = Some(now);
        self.updated_at = Timestamp::now();
    }

    /// Whether the failed-payment ladder still has reminders left.
    pub fn ladder_open(&self) -> bool {
        self.status == PaymentStatus::Rejected
            && self.failed_at.is_some()
            && self.reminders_sent < MAX_FAILURE_REMINDERS
    }
}
