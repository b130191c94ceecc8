//! Adapters: concrete implementations of the ports.

pub mod email;
pub mod gateway;
pub mod messaging;
pub mod postgres;
