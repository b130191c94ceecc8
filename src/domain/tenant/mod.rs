//! Tenant accounts and access-expiration windows.

mod standing;
mod tenant;
mod windows;

pub use standing::PaymentStanding;
pub use tenant::Tenant;
pub use windows::ExpiryWindow;
