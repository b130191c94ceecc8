//! Gateway reconciliation: repairing local state from gateway truth.

mod reconciler;

pub use reconciler::{GatewayReconciler, ReconcileStats};
