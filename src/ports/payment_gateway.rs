//! Payment gateway port for external payment processing.
//!
//! Defines the contract both gateway integrations implement: creating
//! manual payment instruments (PIX and boleto) and reading recurring
//! subscription truth for reconciliation.
//!
//! # Design
//!
//! - **Gateway agnostic**: the application layer never sees provider wire
//!   formats, only these DTOs.
//! - **Idempotent writes**: instrument creation carries an idempotency key
//!   so retries never double-charge.
//! - **Small reads**: subscription and charge lookups are single-page; the
//!   reconciler works record-by-record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{BoletoArtifact, GatewayKind, PixArtifact};

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which provider this instance talks to.
    fn kind(&self) -> GatewayKind;

    /// Creates a short-lived PIX instant-transfer instrument.
    ///
    /// Returns the provider payment id alongside the artifact.
    async fn create_pix_payment(
        &self,
        request: CreatePixRequest,
    ) -> Result<(String, PixArtifact), GatewayError>;

    /// Creates a multi-day boleto voucher instrument.
    async fn create_boleto_payment(
        &self,
        request: CreateBoletoRequest,
    ) -> Result<(String, BoletoArtifact), GatewayError>;

    /// Finds a recurring subscription by payer email, if one exists.
    async fn find_subscription_by_email(
        &self,
        email: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError>;

    /// Fetches a recurring subscription by provider id.
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError>;

    /// Lists approved charges under a subscription.
    async fn list_approved_charges(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<GatewayCharge>, GatewayError>;

    /// Fetches a one-off payment by provider id.
    async fn fetch_payment(
        &self,
        payment_id: &str,
    ) -> Result<Option<GatewayPayment>, GatewayError>;
}

/// Request to create a PIX instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePixRequest {
    pub payer_email: String,
    pub amount_cents: i64,
    pub description: String,

    /// Instrument lifetime; PIX codes are short-lived by design.
    pub expires_in_minutes: i64,

    /// Idempotency key for safe retries.
    pub idempotency_key: String,
}

/// Request to create a boleto instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoletoRequest {
    pub payer_email: String,
    pub amount_cents: i64,
    pub description: String,

    /// Tax document (CPF/CNPJ); boletos cannot be issued without one.
    pub document: String,

    /// Days until the voucher is due.
    pub due_in_days: i64,

    /// Idempotency key for safe retries.
    pub idempotency_key: String,
}

/// Recurring subscription state reported by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Authorized,
    Pending,
    Paused,
    Cancelled,
    Unknown,
}

impl SubscriptionState {
    /// Whether the subscription will still bill on its own; an open
    /// subscription forbids generating a competing manual instrument.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            SubscriptionState::Active | SubscriptionState::Authorized | SubscriptionState::Pending
        )
    }
}

/// Recurring subscription as reported by a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySubscription {
    pub id: String,
    pub payer_email: String,
    pub state: SubscriptionState,
}

/// Status of a single charge under a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Approved,
    Pending,
    Rejected,
}

/// One charge under a recurring subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCharge {
    pub id: String,
    pub status: ChargeStatus,
    pub approved_at: Option<Timestamp>,
    pub amount_cents: i64,
}

/// One-off payment as reported by a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: ChargeStatus,
    pub approved_at: Option<Timestamp>,
}

/// Errors from gateway operations.
#[derive(Debug, Clone)]
pub struct GatewayError {
    message: String,
    retryable: bool,
}

impl GatewayError {
    /// Creates a provider-side error (bad response, unexpected payload).
    pub fn provider(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a network error; these are retryable.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Whether the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GatewayError {}
