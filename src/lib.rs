//! Renova - Subscription Lifecycle Manager
//!
//! This crate tracks tenant paid-access expiration, sends multi-channel
//! renewal reminders, generates unattended renewal payments (PIX/boleto),
//! and reconciles local subscription state against two payment gateways.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
