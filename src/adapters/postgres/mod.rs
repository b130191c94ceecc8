//! PostgreSQL implementations of the repository ports.

mod channel_account_repository;
mod notification_log_repository;
mod payment_repository;
mod plan_repository;
mod tenant_repository;

pub use channel_account_repository::PostgresChannelAccountRepository;
pub use notification_log_repository::PostgresNotificationLogRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use plan_repository::PostgresPlanRepository;
pub use tenant_repository::PostgresTenantRepository;
