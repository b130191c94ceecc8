//! Domain layer: aggregates and value objects, free of I/O concerns.

pub mod foundation;
pub mod notification;
pub mod payment;
pub mod plan;
pub mod tenant;
