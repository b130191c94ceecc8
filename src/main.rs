//! Renova entry point.
//!
//! Wires configuration, the PostgreSQL pool, the gateway and messaging
//! adapters, and the background scheduler, then parks until shutdown.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use renova::adapters::email::{ResendConfig, ResendSender};
use renova::adapters::gateway::{
    AsaasAdapter, AsaasConfig, MercadoPagoAdapter, MercadoPagoConfig,
};
use renova::adapters::messaging::{WhatsAppBridgeAdapter, WhatsAppBridgeConfig};
use renova::adapters::postgres::{
    PostgresChannelAccountRepository, PostgresNotificationLogRepository,
    PostgresPaymentRepository, PostgresPlanRepository, PostgresTenantRepository,
};
use renova::application::dispatch::{NotificationDispatcher, PendingRetryPass};
use renova::application::reconciliation::GatewayReconciler;
use renova::application::reminders::{
    ExpirationReminderJob, FailedPaymentSequencer, RenewalPaymentGenerator,
};
use renova::application::Scheduler;
use renova::config::AppConfig;
use renova::ports::PaymentGateway;

const RETRY_BATCH_SIZE: u32 = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,renova=debug")
        }))
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    info!(
        max_connections = config.database.max_connections,
        "Connecting to PostgreSQL"
    );
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let tenants = Arc::new(PostgresTenantRepository::new(pool.clone()));
    let plans = Arc::new(PostgresPlanRepository::new(pool.clone()));
    let payments = Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let logs = Arc::new(PostgresNotificationLogRepository::new(pool.clone()));
    let accounts = Arc::new(PostgresChannelAccountRepository::new(pool.clone()));

    let mut gateways: Vec<Arc<dyn PaymentGateway>> = Vec::new();
    if config.gateway.has_mercado_pago() {
        gateways.push(Arc::new(MercadoPagoAdapter::new(MercadoPagoConfig::new(
            config.gateway.mercado_pago_access_token.clone(),
        ))));
    }
    if config.gateway.has_asaas() {
        gateways.push(Arc::new(AsaasAdapter::new(AsaasConfig::new(
            config.gateway.asaas_api_key.clone(),
        ))));
    }
    info!(gateways = gateways.len(), "Payment gateways configured");

    let channel = Arc::new(WhatsAppBridgeAdapter::new(WhatsAppBridgeConfig::new(
        config.messaging.bridge_api_key.clone(),
        config.messaging.bridge_url.clone(),
    )));
    let email = Arc::new(ResendSender::new(ResendConfig::new(
        config.email.resend_api_key.clone(),
        config.email.from_header(),
    )));

    let dispatcher = Arc::new(NotificationDispatcher::new(
        logs.clone(),
        accounts.clone(),
        channel.clone(),
        config.messaging.enabled,
    ));
    let renewal = Arc::new(RenewalPaymentGenerator::new(
        payments.clone(),
        gateways.clone(),
        email.clone(),
        config.gateway.checkout_url.clone(),
    ));
    let reminders = Arc::new(ExpirationReminderJob::new(
        tenants.clone(),
        plans.clone(),
        dispatcher.clone(),
        email.clone(),
        renewal,
    ));
    let sequencer = Arc::new(FailedPaymentSequencer::new(
        payments.clone(),
        tenants.clone(),
        dispatcher.clone(),
        email,
        config.gateway.checkout_url.clone(),
    ));
    let reconciler = Arc::new(GatewayReconciler::new(
        tenants, plans, payments, gateways,
    ));
    let retry = Arc::new(PendingRetryPass::new(
        logs,
        accounts,
        channel,
        RETRY_BATCH_SIZE,
    ));

    let scheduler = Scheduler::new(
        reminders,
        sequencer,
        reconciler,
        retry,
        config.scheduler.intervals(),
    );
    scheduler.start();
    info!("Scheduler started");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
    scheduler.stop();
    pool.close().await;

    Ok(())
}
