//! Payment gateway HTTP adapters.

mod asaas;
mod mercado_pago;

pub use asaas::{AsaasAdapter, AsaasConfig};
pub use mercado_pago::{MercadoPagoAdapter, MercadoPagoConfig};

/// Converts a minor-unit amount to the decimal form both gateway APIs use.
fn cents_to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}
