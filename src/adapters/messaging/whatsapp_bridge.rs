//! WhatsApp bridge adapter.
//!
//! Talks to a self-hosted multi-instance WhatsApp bridge. Each channel
//! account maps to a bridge instance by name; the bridge exposes a
//! connection-state probe and a plain-text send endpoint per instance.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::domain::notification::{ChannelAccount, ConnectionStatus};
use crate::ports::{ChannelError, MessageChannel};

/// WhatsApp bridge configuration.
#[derive(Clone)]
pub struct WhatsAppBridgeConfig {
    api_key: SecretString,
    api_base_url: String,
}

impl WhatsAppBridgeConfig {
    pub fn new(api_key: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: api_base_url.into(),
        }
    }
}

/// Adapter implementing the MessageChannel port over the bridge HTTP API.
pub struct WhatsAppBridgeAdapter {
    config: WhatsAppBridgeConfig,
    http_client: reqwest::Client,
}

impl WhatsAppBridgeAdapter {
    pub fn new(config: WhatsAppBridgeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct InstanceStateResponse {
    instance: InstanceState,
}

#[derive(Debug, Deserialize)]
struct InstanceState {
    state: String,
}

fn map_connection_state(state: &str) -> ConnectionStatus {
    match state {
        "open" => ConnectionStatus::Connected,
        _ => ConnectionStatus::Disconnected,
    }
}

/// Normalizes a contact into the digits-only form the bridge expects.
fn normalize_contact(contact: &str) -> String {
    contact.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[async_trait]
impl MessageChannel for WhatsAppBridgeAdapter {
    async fn connection_status(
        &self,
        account: &ChannelAccount,
    ) -> Result<ConnectionStatus, ChannelError> {
        let response = self
            .http_client
            .get(self.url(&format!("/instance/connectionState/{}", account.name)))
            .header("apikey", self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ChannelError::new(format!("Bridge state request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ChannelError::new(format!(
                "Bridge returned {} for instance {}",
                response.status(),
                account.name
            )));
        }

        let body: InstanceStateResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::new(format!("Invalid bridge state payload: {}", e)))?;
        Ok(map_connection_state(&body.instance.state))
    }

    async fn send_text(
        &self,
        account: &ChannelAccount,
        contact: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        let number = normalize_contact(contact);
        if number.is_empty() {
            return Err(ChannelError::new(format!(
                "Contact has no usable digits: {}",
                contact
            )));
        }

        let response = self
            .http_client
            .post(self.url(&format!("/message/sendText/{}", account.name)))
            .header("apikey", self.config.api_key.expose_secret())
            .json(&json!({ "number": number, "text": text }))
            .send()
            .await
            .map_err(|e| ChannelError::new(format!("Bridge send request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ChannelError::new(format!(
                "Bridge returned {} sending through {}",
                response.status(),
                account.name
            )));
        }
        Ok(())
    }
}
