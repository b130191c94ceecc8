//! Payment records and gateway references.

mod record;

pub use record::{
    BoletoArtifact, GatewayKind, GatewayRefs, PaymentRecord, PaymentStatus, PixArtifact,
    MAX_FAILURE_REMINDERS,
};
