//! Multi-channel notification dispatcher.
//!
//! Delivery is at-least-once: a pending log entry is written before every
//! attempt so a crash or an unavailable channel account leaves a row the
//! retry pass can pick up. Accounts rotate round-robin within the
//! notifications scope, preferring those under their hourly quota.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::notification::{AccountScope, ChannelAccount, NotificationKind, NotificationLog};
use crate::ports::{ChannelAccountRepository, MessageChannel, NotificationLogRepository};

/// Sends notifications over the messaging channel, one log entry per attempt.
pub struct NotificationDispatcher {
    logs: Arc<dyn NotificationLogRepository>,
    accounts: Arc<dyn ChannelAccountRepository>,
    channel: Arc<dyn MessageChannel>,
    enabled: bool,
    cursor: AtomicUsize,
}

impl NotificationDispatcher {
    pub fn new(
        logs: Arc<dyn NotificationLogRepository>,
        accounts: Arc<dyn ChannelAccountRepository>,
        channel: Arc<dyn MessageChannel>,
        enabled: bool,
    ) -> Self {
        Self {
            logs,
            accounts,
            channel,
            enabled,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Attempts to deliver `message` to `contact`.
    ///
    /// Returns `Ok(true)` when the message was sent, `Ok(false)` when it was
    /// not (channel disabled, no contact, no usable account, or the send
    /// failed). A log entry left `pending` means the retry pass will take
    /// another shot; `failed` means the channel itself rejected the send.
    pub async fn send(
        &self,
        contact: Option<&str>,
        message: &str,
        kind: NotificationKind,
    ) -> Result<bool, DomainError> {
        if !self.enabled {
            debug!(kind = kind.as_str(), "messaging channel disabled, skipping send");
            return Ok(false);
        }

        let contact = match contact {
            Some(c) if !c.is_empty() => c,
            _ => {
                debug!(kind = kind.as_str(), "no messaging contact, skipping send");
                return Ok(false);
            }
        };

        // Logged before the attempt so failures survive crashes.
        let mut entry = NotificationLog::new_pending(kind, contact, message);
        self.logs.save(&entry).await?;

        let candidates = self
            .accounts
            .connected_by_scope(AccountScope::Notifications)
            .await?;

        let account = match self.pick_account(&candidates) {
            Some(a) => a,
            None => {
                // Queued, not failed: the retry pass resends once an
                // account frees up.
                debug!(
                    entry_id = %entry.id,
                    "no channel account under quota, leaving entry pending"
                );
                return Ok(false);
            }
        };

        match self.channel.send_text(account, contact, message).await {
            Ok(()) => {
                self.accounts.increment_hourly(&account.id).await?;
                entry.mark_sent(Timestamp::now());
                self.logs.update(&entry).await?;
                Ok(true)
            }
            Err(e) => {
                warn!(
                    entry_id = %entry.id,
                    account = %account.name,
                    error = %e,
                    "channel send failed"
                );
                entry.mark_failed(e.message());
                self.logs.update(&entry).await?;
                Ok(false)
            }
        }
    }

    /// Round-robin selection among connected accounts, preferring one under
    /// its hourly quota.
    fn pick_account<'a>(&self, candidates: &'a [ChannelAccount]) -> Option<&'a ChannelAccount> {
        if candidates.is_empty() {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        (0..candidates.len())
            .map(|offset| &candidates[(start + offset) % candidates.len()])
            .find(|a| a.usable())
    }
}
