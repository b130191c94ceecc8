//! Multi-channel notification dispatch and the pending-retry pass.

mod dispatcher;
mod retry;

pub use dispatcher::NotificationDispatcher;
pub use retry::{PendingRetryPass, RetryStats};
