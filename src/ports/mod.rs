//! Ports: contracts consumed by the application layer.
//!
//! Each port is an `async_trait` boundary implemented by an adapter
//! (PostgreSQL repositories, gateway HTTP clients, the messaging bridge,
//! the email provider).

mod channel_account_repository;
mod email_sender;
mod message_channel;
mod notification_log_repository;
mod payment_gateway;
mod payment_repository;
mod plan_repository;
mod tenant_repository;

pub use channel_account_repository::ChannelAccountRepository;
pub use email_sender::{EmailError, EmailSender, OutboundEmail};
pub use message_channel::{ChannelError, MessageChannel};
pub use notification_log_repository::NotificationLogRepository;
pub use payment_gateway::{
    ChargeStatus, CreateBoletoRequest, CreatePixRequest, GatewayCharge, GatewayError,
    GatewayPayment, GatewaySubscription, PaymentGateway, SubscriptionState,
};
pub use payment_repository::PaymentRepository;
pub use plan_repository::PlanRepository;
pub use tenant_repository::TenantRepository;
