//! Messaging bridge configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Messaging bridge configuration (WhatsApp)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MessagingConfig {
    /// Bridge API base URL
    #[serde(default)]
    pub bridge_url: String,

    /// Bridge API key
    #[serde(default)]
    pub bridge_api_key: String,

    /// Master switch for channel sends; email keeps flowing when off
    #[serde(default)]
    pub enabled: bool,
}

impl MessagingConfig {
    /// Validate messaging configuration
    ///
    /// Credentials are only required when the channel is enabled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }
        if self.bridge_url.is_empty() {
            return Err(ValidationError::MissingRequired("BRIDGE_URL"));
        }
        if !self.bridge_url.starts_with("http://") && !self.bridge_url.starts_with("https://") {
            return Err(ValidationError::InvalidBridgeUrl);
        }
        if self.bridge_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("BRIDGE_API_KEY"));
        }
        Ok(())
    }
}
