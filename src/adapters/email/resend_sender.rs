//! Resend email adapter.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::ports::{EmailError, EmailSender, OutboundEmail};

/// Resend API configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    from_address: String,
    api_base_url: String,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>, from_address: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from_address: from_address.into(),
            api_base_url: "https://api.resend.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Email sender backed by the Resend HTTP API.
pub struct ResendSender {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendSender {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        let body = json!({
            "from": self.config.from_address,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
        });

        let response = self
            .http_client
            .post(format!("{}/emails", self.config.api_base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::new(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EmailError::new(format!(
                "Email provider returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
