//! Payment gateway configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration (Mercado Pago and Asaas)
///
/// At least one gateway credential must be present. The checkout URL is the
/// fallback payment link offered when no instrument could be generated.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    /// Mercado Pago access token
    #[serde(default)]
    pub mercado_pago_access_token: String,

    /// Asaas API key
    #[serde(default)]
    pub asaas_api_key: String,

    /// Hosted checkout page URL
    pub checkout_url: String,
}

impl GatewayConfig {
    pub fn has_mercado_pago(&self) -> bool {
        !self.mercado_pago_access_token.is_empty()
    }

    pub fn has_asaas(&self) -> bool {
        !self.asaas_api_key.is_empty()
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_mercado_pago() && !self.has_asaas() {
            return Err(ValidationError::NoGatewayConfigured);
        }
        if self.checkout_url.is_empty() {
            return Err(ValidationError::MissingRequired("CHECKOUT_URL"));
        }
        if !self.checkout_url.starts_with("http://") && !self.checkout_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidCheckoutUrl);
        }
        Ok(())
    }
}
