//! Mercado Pago payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait against the Mercado Pago REST API:
//! one-off PIX and boleto payments under `/v1/payments`, recurring
//! subscriptions (preapprovals) under `/preapproval`.
//!
//! # Security
//!
//! - Access token handled via `secrecy::SecretString`
//! - Instrument creation sends `X-Idempotency-Key` so retries never
//!   double-create

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{BoletoArtifact, GatewayKind, PixArtifact};
use crate::ports::{
    ChargeStatus, CreateBoletoRequest, CreatePixRequest, GatewayCharge, GatewayError,
    GatewayPayment, GatewaySubscription, PaymentGateway, SubscriptionState,
};

use super::cents_to_decimal;

/// Mercado Pago API configuration.
#[derive(Clone)]
pub struct MercadoPagoConfig {
    access_token: SecretString,
    api_base_url: String,
}

impl MercadoPagoConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            api_base_url: "https://api.mercadopago.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Mercado Pago payment gateway adapter.
pub struct MercadoPagoAdapter {
    config: MercadoPagoConfig,
    http_client: reqwest::Client,
}

impl MercadoPagoAdapter {
    pub fn new(config: MercadoPagoConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.access_token.expose_secret())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, GatewayError> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("Mercado Pago request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::provider(format!(
                "Mercado Pago returned {} for {}",
                response.status(),
                path
            )));
        }
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| GatewayError::provider(format!("Invalid Mercado Pago payload: {}", e)))
    }

    async fn create_payment(
        &self,
        body: serde_json::Value,
        idempotency_key: &str,
    ) -> Result<MpPayment, GatewayError> {
        let response = self
            .http_client
            .post(self.url("/v1/payments"))
            .header("Authorization", self.bearer())
            .header("X-Idempotency-Key", idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("Mercado Pago request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::provider(format!(
                "Mercado Pago payment creation returned {}",
                response.status()
            )));
        }
        response
            .json::<MpPayment>()
            .await
            .map_err(|e| GatewayError::provider(format!("Invalid Mercado Pago payload: {}", e)))
    }
}

/// Payment object from `/v1/payments`.
#[derive(Debug, Deserialize)]
struct MpPayment {
    id: i64,
    status: String,
    date_approved: Option<String>,
    date_of_expiration: Option<String>,
    #[serde(default)]
    point_of_interaction: Option<MpPointOfInteraction>,
    #[serde(default)]
    transaction_details: Option<MpTransactionDetails>,
    #[serde(default)]
    barcode: Option<MpBarcode>,
}

#[derive(Debug, Deserialize)]
struct MpPointOfInteraction {
    transaction_data: Option<MpTransactionData>,
}

#[derive(Debug, Deserialize)]
struct MpTransactionData {
    qr_code: Option<String>,
    qr_code_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MpTransactionDetails {
    external_resource_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MpBarcode {
    content: Option<String>,
}

/// Preapproval (recurring subscription) object.
#[derive(Debug, Deserialize)]
struct MpPreapproval {
    id: String,
    status: String,
    #[serde(default)]
    payer_email: String,
}

#[derive(Debug, Deserialize)]
struct MpSearchResults<T> {
    results: Vec<T>,
}

/// Authorized charge under a preapproval.
#[derive(Debug, Deserialize)]
struct MpAuthorizedPayment {
    id: i64,
    status: String,
    date_approved: Option<String>,
    transaction_amount: Option<f64>,
}

fn map_subscription_state(status: &str) -> SubscriptionState {
    match status {
        "authorized" => SubscriptionState::Authorized,
        "active" => SubscriptionState::Active,
        "pending" => SubscriptionState::Pending,
        "paused" => SubscriptionState::Paused,
        "cancelled" => SubscriptionState::Cancelled,
        _ => SubscriptionState::Unknown,
    }
}

fn map_charge_status(status: &str) -> ChargeStatus {
    match status {
        "approved" | "accredited" => ChargeStatus::Approved,
        "rejected" | "cancelled" | "refunded" | "charged_back" => ChargeStatus::Rejected,
        _ => ChargeStatus::Pending,
    }
}

fn parse_timestamp(value: &Option<String>) -> Option<Timestamp> {
    value
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
}

#[async_trait]
impl PaymentGateway for MercadoPagoAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::MercadoPago
    }

    async fn create_pix_payment(
        &self,
        request: CreatePixRequest,
    ) -> Result<(String, PixArtifact), GatewayError> {
        let expires_at = Timestamp::now().plus_minutes(request.expires_in_minutes);
        let body = json!({
            "transaction_amount": cents_to_decimal(request.amount_cents),
            "description": request.description,
            "payment_method_id": "pix",
            "date_of_expiration": expires_at.as_datetime().to_rfc3339(),
            "payer": { "email": request.payer_email },
        });

        let payment = self.create_payment(body, &request.idempotency_key).await?;
        let data = payment
            .point_of_interaction
            .and_then(|poi| poi.transaction_data)
            .ok_or_else(|| GatewayError::provider("PIX payment came back without QR data"))?;
        let code = data
            .qr_code
            .ok_or_else(|| GatewayError::provider("PIX payment came back without code"))?;

        Ok((
            payment.id.to_string(),
            PixArtifact {
                code,
                qr_base64: data.qr_code_base64.unwrap_or_default(),
                expires_at: parse_timestamp(&payment.date_of_expiration).unwrap_or(expires_at),
            },
        ))
    }

    async fn create_boleto_payment(
        &self,
        request: CreateBoletoRequest,
    ) -> Result<(String, BoletoArtifact), GatewayError> {
        let due_at = Timestamp::now().plus_days(request.due_in_days);
        let document_type = if request.document.len() == 14 { "CNPJ" } else { "CPF" };
        let body = json!({
            "transaction_amount": cents_to_decimal(request.amount_cents),
            "description": request.description,
            "payment_method_id": "bolbradesco",
            "date_of_expiration": due_at.as_datetime().to_rfc3339(),
            "payer": {
                "email": request.payer_email,
                "identification": { "type": document_type, "number": request.document },
            },
        });

        let payment = self.create_payment(body, &request.idempotency_key).await?;
        let url = payment
            .transaction_details
            .and_then(|d| d.external_resource_url)
            .ok_or_else(|| GatewayError::provider("Boleto payment came back without URL"))?;
        let line_code = payment
            .barcode
            .and_then(|b| b.content)
            .unwrap_or_default();

        Ok((
            payment.id.to_string(),
            BoletoArtifact {
                line_code,
                url,
                due_at: parse_timestamp(&payment.date_of_expiration).unwrap_or(due_at),
            },
        ))
    }

    async fn find_subscription_by_email(
        &self,
        email: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError> {
        let results: Option<MpSearchResults<MpPreapproval>> = self
            .get_json("/preapproval/search", &[("payer_email", email)])
            .await?;
        Ok(results.and_then(|r| {
            r.results.into_iter().next().map(|p| GatewaySubscription {
                state: map_subscription_state(&p.status),
                id: p.id,
                payer_email: p.payer_email,
            })
        }))
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError> {
        let preapproval: Option<MpPreapproval> = self
            .get_json(&format!("/preapproval/{}", subscription_id), &[])
            .await?;
        Ok(preapproval.map(|p| GatewaySubscription {
            state: map_subscription_state(&p.status),
            id: p.id,
            payer_email: p.payer_email,
        }))
    }

    async fn list_approved_charges(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<GatewayCharge>, GatewayError> {
        let results: Option<MpSearchResults<MpAuthorizedPayment>> = self
            .get_json(
                "/authorized_payments/search",
                &[("preapproval_id", subscription_id)],
            )
            .await?;
        Ok(results
            .map(|r| {
                r.results
                    .into_iter()
                    .map(|p| GatewayCharge {
                        id: p.id.to_string(),
                        status: map_charge_status(&p.status),
                        approved_at: parse_timestamp(&p.date_approved),
                        amount_cents: p
                            .transaction_amount
                            .map(|a| (a * 100.0).round() as i64)
                            .unwrap_or(0),
                    })
                    .filter(|c| c.status == ChargeStatus::Approved)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_payment(
        &self,
        payment_id: &str,
    ) -> Result<Option<GatewayPayment>, GatewayError> {
        let payment: Option<MpPayment> = self
            .get_json(&format!("/v1/payments/{}", payment_id), &[])
            .await?;
        Ok(payment.map(|p| GatewayPayment {
            id: p.id.to_string(),
            status: map_charge_status(&p.status),
            approved_at: parse_timestamp(&p.date_approved),
        }))
    }
}
