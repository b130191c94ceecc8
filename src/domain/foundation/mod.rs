//! Foundation types shared across the domain layer.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{ChannelAccountId, NotificationId, PaymentId, PlanId, TenantId};
pub use timestamp::Timestamp;
