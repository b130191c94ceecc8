//! Asaas payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait against the Asaas v3 REST API.
//! Asaas keys payments to a customer record, so instrument creation first
//! resolves (or creates) the customer for the payer email. Authentication is
//! the `access_token` header.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
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

/// Asaas API configuration.
#[derive(Clone)]
pub struct AsaasConfig {
    api_key: SecretString,
    api_base_url: String,
}

impl AsaasConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.asaas.com/v3".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Asaas payment gateway adapter.
pub struct AsaasAdapter {
    config: AsaasConfig,
    http_client: reqwest::Client,
}

impl AsaasAdapter {
    pub fn new(config: AsaasConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
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
            .header("access_token", self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("Asaas request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::provider(format!(
                "Asaas returned {} for {}",
                response.status(),
                path
            )));
        }
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| GatewayError::provider(format!("Invalid Asaas payload: {}", e)))
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
        idempotency_key: Option<&str>,
    ) -> Result<T, GatewayError> {
        let mut request = self
            .http_client
            .post(self.url(path))
            .header("access_token", self.config.api_key.expose_secret())
            .json(&body);
        if let Some(key) = idempotency_key {
            request = request.header("asaas-idempotency-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("Asaas request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::provider(format!(
                "Asaas returned {} for {}",
                response.status(),
                path
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::provider(format!("Invalid Asaas payload: {}", e)))
    }

    /// Resolves the Asaas customer id for a payer email, creating the
    /// customer when none exists.
    async fn resolve_customer(
        &self,
        email: &str,
        document: Option<&str>,
    ) -> Result<String, GatewayError> {
        let existing: Option<AsaasList<AsaasCustomer>> =
            self.get_json("/customers", &[("email", email)]).await?;
        if let Some(customer) = existing.and_then(|l| l.data.into_iter().next()) {
            return Ok(customer.id);
        }

        let mut body = json!({ "name": email, "email": email });
        if let Some(doc) = document {
            body["cpfCnpj"] = json!(doc);
        }
        let created: AsaasCustomer = self.post_json("/customers", body, None).await?;
        Ok(created.id)
    }

    async fn create_charge(
        &self,
        customer_id: &str,
        billing_type: &str,
        amount_cents: i64,
        description: &str,
        due_at: Timestamp,
        idempotency_key: &str,
    ) -> Result<AsaasPayment, GatewayError> {
        let body = json!({
            "customer": customer_id,
            "billingType": billing_type,
            "value": cents_to_decimal(amount_cents),
            "description": description,
            "dueDate": due_at.as_datetime().format("%Y-%m-%d").to_string(),
        });
        self.post_json("/payments", body, Some(idempotency_key)).await
    }
}

#[derive(Debug, Deserialize)]
struct AsaasList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AsaasCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AsaasPayment {
    id: String,
    status: String,
    #[serde(rename = "paymentDate")]
    payment_date: Option<String>,
    #[serde(rename = "dueDate")]
    due_date: Option<String>,
    value: Option<f64>,
    #[serde(rename = "bankSlipUrl")]
    bank_slip_url: Option<String>,
    #[serde(rename = "identificationField")]
    identification_field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsaasPixQr {
    payload: String,
    #[serde(rename = "encodedImage")]
    encoded_image: Option<String>,
    #[serde(rename = "expirationDate")]
    expiration_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsaasSubscription {
    id: String,
    status: String,
}

fn map_subscription_state(status: &str) -> SubscriptionState {
    match status {
        "ACTIVE" => SubscriptionState::Active,
        "INACTIVE" => SubscriptionState::Paused,
        "EXPIRED" => SubscriptionState::Cancelled,
        _ => SubscriptionState::Unknown,
    }
}

fn map_charge_status(status: &str) -> ChargeStatus {
    match status {
        "RECEIVED" | "CONFIRMED" | "RECEIVED_IN_CASH" => ChargeStatus::Approved,
        "OVERDUE" | "REFUNDED" | "CHARGEBACK_REQUESTED" | "DELETED" => ChargeStatus::Rejected,
        _ => ChargeStatus::Pending,
    }
}

/// Asaas returns bare dates (`YYYY-MM-DD`); midnight UTC is close enough for
/// cycle arithmetic.
fn parse_date(value: &Option<String>) -> Option<Timestamp> {
    value
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Timestamp::from_datetime(Utc.from_utc_datetime(&dt)))
}

#[async_trait]
impl PaymentGateway for AsaasAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Asaas
    }

    async fn create_pix_payment(
        &self,
        request: CreatePixRequest,
    ) -> Result<(String, PixArtifact), GatewayError> {
        let customer_id = self.resolve_customer(&request.payer_email, None).await?;
        let expires_at = Timestamp::now().plus_minutes(request.expires_in_minutes);
        let payment = self
            .create_charge(
                &customer_id,
                "PIX",
                request.amount_cents,
                &request.description,
                expires_at,
                &request.idempotency_key,
            )
            .await?;

        let qr: AsaasPixQr = self
            .get_json(&format!("/payments/{}/pixQrCode", payment.id), &[])
            .await?
            .ok_or_else(|| GatewayError::provider("PIX charge came back without QR data"))?;

        Ok((
            payment.id,
            PixArtifact {
                code: qr.payload,
                qr_base64: qr.encoded_image.unwrap_or_default(),
                expires_at: parse_date(&qr.expiration_date).unwrap_or(expires_at),
            },
        ))
    }

    async fn create_boleto_payment(
        &self,
        request: CreateBoletoRequest,
    ) -> Result<(String, BoletoArtifact), GatewayError> {
        let customer_id = self
            .resolve_customer(&request.payer_email, Some(&request.document))
            .await?;
        let due_at = Timestamp::now().plus_days(request.due_in_days);
        let payment = self
            .create_charge(
                &customer_id,
                "BOLETO",
                request.amount_cents,
                &request.description,
                due_at,
                &request.idempotency_key,
            )
            .await?;

        let url = payment
            .bank_slip_url
            .ok_or_else(|| GatewayError::provider("Boleto charge came back without URL"))?;

        Ok((
            payment.id,
            BoletoArtifact {
                line_code: payment.identification_field.unwrap_or_default(),
                url,
                due_at: parse_date(&payment.due_date).unwrap_or(due_at),
            },
        ))
    }

    async fn find_subscription_by_email(
        &self,
        email: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError> {
        let customers: Option<AsaasList<AsaasCustomer>> =
            self.get_json("/customers", &[("email", email)]).await?;
        let customer = match customers.and_then(|l| l.data.into_iter().next()) {
            Some(c) => c,
            None => return Ok(None),
        };

        let subscriptions: Option<AsaasList<AsaasSubscription>> = self
            .get_json("/subscriptions", &[("customer", customer.id.as_str())])
            .await?;
        Ok(subscriptions.and_then(|l| {
            l.data.into_iter().next().map(|s| GatewaySubscription {
                state: map_subscription_state(&s.status),
                id: s.id,
                payer_email: email.to_string(),
            })
        }))
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError> {
        let subscription: Option<AsaasSubscription> = self
            .get_json(&format!("/subscriptions/{}", subscription_id), &[])
            .await?;
        Ok(subscription.map(|s| GatewaySubscription {
            state: map_subscription_state(&s.status),
            id: s.id,
            payer_email: String::new(),
        }))
    }

    async fn list_approved_charges(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<GatewayCharge>, GatewayError> {
        let payments: Option<AsaasList<AsaasPayment>> = self
            .get_json(
                &format!("/subscriptions/{}/payments", subscription_id),
                &[],
            )
            .await?;
        Ok(payments
            .map(|l| {
                l.data
                    .into_iter()
                    .map(|p| GatewayCharge {
                        status: map_charge_status(&p.status),
                        approved_at: parse_date(&p.payment_date),
                        amount_cents: p.value.map(|v| (v * 100.0).round() as i64).unwrap_or(0),
                        id: p.id,
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
        let payment: Option<AsaasPayment> = self
            .get_json(&format!("/payments/{}", payment_id), &[])
            .await?;
        Ok(payment.map(|p| GatewayPayment {
            status: map_charge_status(&p.status),
            approved_at: parse_date(&p.payment_date),
            id: p.id,
        }))
    }
}
