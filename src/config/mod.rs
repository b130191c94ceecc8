//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the `RENOVA_`
//! prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use renova::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod email;
mod error;
mod gateway;
mod messaging;
mod scheduler;

pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use messaging::MessagingConfig;
pub use scheduler::SchedulerConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Email configuration (Resend)
    pub email: EmailConfig,

    /// Payment gateway configuration (Mercado Pago, Asaas)
    pub gateway: GatewayConfig,

    /// Messaging bridge configuration (WhatsApp)
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Scheduler loop intervals
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads environment variables with the
    /// `RENOVA` prefix and `__` separators:
    ///
    /// - `RENOVA__DATABASE__URL=...` -> `database.url`
    /// - `RENOVA__SCHEDULER__RETRY_SECS=30` -> `scheduler.retry_secs`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("RENOVA").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.email.validate()?;
        self.gateway.validate()?;
        self.messaging.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("RENOVA__DATABASE__URL", "postgresql://test@localhost/renova");
        env::set_var("RENOVA__EMAIL__RESEND_API_KEY", "re_xxx");
        env::set_var("RENOVA__GATEWAY__MERCADO_PAGO_ACCESS_TOKEN", "APP_USR-xxx");
        env::set_var("RENOVA__GATEWAY__CHECKOUT_URL", "https://pay.example.com");
    }

    fn clear_env() {
        env::remove_var("RENOVA__DATABASE__URL");
        env::remove_var("RENOVA__EMAIL__RESEND_API_KEY");
        env::remove_var("RENOVA__GATEWAY__MERCADO_PAGO_ACCESS_TOKEN");
        env::remove_var("RENOVA__GATEWAY__CHECKOUT_URL");
        env::remove_var("RENOVA__SCHEDULER__RETRY_SECS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/renova");
        assert!(config.gateway.has_mercado_pago());
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok());
        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_scheduler_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.scheduler.reminder_secs, 3_600);
        assert_eq!(config.scheduler.retry_secs, 60);
    }

    #[test]
    fn test_scheduler_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("RENOVA__SCHEDULER__RETRY_SECS", "30");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.scheduler.retry_secs, 30);
    }
}
