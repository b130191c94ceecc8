//! Messaging channel adapters.

mod whatsapp_bridge;

pub use whatsapp_bridge::{WhatsAppBridgeAdapter, WhatsAppBridgeConfig};
