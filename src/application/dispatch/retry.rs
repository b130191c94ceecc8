//! Retry pass over pending notification log entries.
//!
//! Runs on a short interval and resends entries the dispatcher had to leave
//! queued (no account under quota, bridge briefly unavailable). Before each
//! send the account's live connection is checked; a disconnected account is
//! marked as such and the batch stops early rather than burning through the
//! queue against a dead bridge. The account snapshot's counters advance
//! locally per send, so one batch cannot overrun an account's hourly quota.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::notification::{AccountScope, ConnectionStatus};
use crate::ports::{ChannelAccountRepository, MessageChannel, NotificationLogRepository};

/// Outcome counters for one retry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub scanned: u32,
    pub sent: u32,
    pub failed: u32,
    pub left_pending: u32,
}

/// Drains pending notification log entries through a usable account.
pub struct PendingRetryPass {
    logs: Arc<dyn NotificationLogRepository>,
    accounts: Arc<dyn ChannelAccountRepository>,
    channel: Arc<dyn MessageChannel>,
    batch_size: u32,
}

impl PendingRetryPass {
    pub fn new(
        logs: Arc<dyn NotificationLogRepository>,
        accounts: Arc<dyn ChannelAccountRepository>,
        channel: Arc<dyn MessageChannel>,
        batch_size: u32,
    ) -> Self {
        Self {
            logs,
            accounts,
            channel,
            batch_size,
        }
    }

    /// Runs one pass over the pending queue.
    pub async fn run(&self) -> Result<RetryStats, DomainError> {
        let mut stats = RetryStats::default();

        let pending = self.logs.pending(self.batch_size).await?;
        if pending.is_empty() {
            return Ok(stats);
        }
        stats.scanned = pending.len() as u32;

        let mut candidates = self
            .accounts
            .connected_by_scope(AccountScope::Notifications)
            .await?;

        'entries: for mut entry in pending {
            let slot = match candidates.iter().position(|a| a.usable()) {
                Some(i) => i,
                None => {
                    stats.left_pending += 1;
                    continue;
                }
            };
            let account = candidates[slot].clone();

            // The repository's connection flag can be stale; ask the bridge.
            match self.channel.connection_status(&account).await {
                Ok(ConnectionStatus::Connected) => {}
                Ok(ConnectionStatus::Disconnected) => {
                    warn!(account = %account.name, "account disconnected, stopping retry batch");
                    self.accounts
                        .set_connection_status(&account.id, ConnectionStatus::Disconnected)
                        .await?;
                    stats.left_pending += stats.scanned - stats.sent - stats.failed;
                    break 'entries;
                }
                Err(e) => {
                    warn!(account = %account.name, error = %e, "connection check failed");
                    stats.left_pending += stats.scanned - stats.sent - stats.failed;
                    break 'entries;
                }
            }

            match self
                .channel
                .send_text(&account, &entry.recipient, &entry.message)
                .await
            {
                Ok(()) => {
                    self.accounts.increment_hourly(&account.id).await?;
                    candidates[slot].record_send();
                    entry.mark_sent(Timestamp::now());
                    self.logs.update(&entry).await?;
                    stats.sent += 1;
                }
                Err(e) => {
                    debug!(entry_id = %entry.id, error = %e, "retry send failed");
                    entry.mark_failed(e.message());
                    self.logs.update(&entry).await?;
                    stats.failed += 1;
                }
            }
        }

        if stats.sent > 0 || stats.failed > 0 {
            info!(
                scanned = stats.scanned,
                sent = stats.sent,
                failed = stats.failed,
                "pending notification retry pass finished"
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ChannelAccountId;
    use crate::domain::notification::{
        ChannelAccount, DeliveryStatus, NotificationKind, NotificationLog,
    };
    use crate::ports::ChannelError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockLogRepository {
        entries: Mutex<Vec<NotificationLog>>,
    }

    impl MockLogRepository {
        fn with_pending(count: usize) -> Self {
            let entries = (0..count)
                .map(|i| {
                    NotificationLog::new_pending(
                        NotificationKind::DailyReminder,
                        format!("+55119999900{i:02}"),
                        "Your access expires soon",
                    )
                })
                .collect();
            Self {
                entries: Mutex::new(entries),
            }
        }

        fn count_with_status(&self, status: DeliveryStatus) -> usize {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.status == status)
                .count()
        }
    }

    #[async_trait]
    impl NotificationLogRepository for MockLogRepository {
        async fn save(&self, entry: &NotificationLog) -> Result<(), DomainError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn update(&self, entry: &NotificationLog) -> Result<(), DomainError> {
            let mut entries = self.entries.lock().unwrap();
            if let Some(pos) = entries.iter().position(|e| e.id == entry.id) {
                entries[pos] = entry.clone();
            }
            Ok(())
        }

        async fn pending(&self, limit: u32) -> Result<Vec<NotificationLog>, DomainError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.status == DeliveryStatus::Pending)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    struct MockAccountRepository {
        accounts: Mutex<Vec<ChannelAccount>>,
    }

    impl MockAccountRepository {
        fn with_accounts(accounts: Vec<ChannelAccount>) -> Self {
            Self {
                accounts: Mutex::new(accounts),
            }
        }

        fn connection_of(&self, id: &ChannelAccountId) -> Option<ConnectionStatus> {
            self.accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| &a.id == id)
                .map(|a| a.connection)
        }
    }

    #[async_trait]
    impl ChannelAccountRepository for MockAccountRepository {
        async fn connected_by_scope(
            &self,
            scope: AccountScope,
        ) -> Result<Vec<ChannelAccount>, DomainError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.scope == scope && a.is_connected())
                .cloned()
                .collect())
        }

        async fn increment_hourly(&self, id: &ChannelAccountId) -> Result<(), DomainError> {
            let mut accounts = self.accounts.lock().unwrap();
            if let Some(a) = accounts.iter_mut().find(|a| &a.id == id) {
                a.sent_this_hour += 1;
            }
            Ok(())
        }

        async fn set_connection_status(
            &self,
            id: &ChannelAccountId,
            status: ConnectionStatus,
        ) -> Result<(), DomainError> {
            let mut accounts = self.accounts.lock().unwrap();
            if let Some(a) = accounts.iter_mut().find(|a| &a.id == id) {
                a.connection = status;
            }
            Ok(())
        }
    }

    struct MockChannel {
        live_status: ConnectionStatus,
        sent: Mutex<usize>,
    }

    impl MockChannel {
        fn with_status(live_status: ConnectionStatus) -> Self {
            Self {
                live_status,
                sent: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl MessageChannel for MockChannel {
        async fn connection_status(
            &self,
            _account: &ChannelAccount,
        ) -> Result<ConnectionStatus, ChannelError> {
            Ok(self.live_status)
        }

        async fn send_text(
            &self,
            _account: &ChannelAccount,
            _contact: &str,
            _text: &str,
        ) -> Result<(), ChannelError> {
            *self.sent.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn account() -> ChannelAccount {
        ChannelAccount {
            id: ChannelAccountId::new(),
            name: "notify-01".to_string(),
            scope: AccountScope::Notifications,
            hourly_limit: 30,
            sent_this_hour: 0,
            connection: ConnectionStatus::Connected,
        }
    }

    #[tokio::test]
    async fn resends_pending_entries() {
        let logs = Arc::new(MockLogRepository::with_pending(3));
        let accounts = Arc::new(MockAccountRepository::with_accounts(vec![account()]));
        let channel = Arc::new(MockChannel::with_status(ConnectionStatus::Connected));
        let pass = PendingRetryPass::new(logs.clone(), accounts, channel, 50);

        let stats = pass.run().await.unwrap();

        assert_eq!(stats.scanned, 3);
        assert_eq!(stats.sent, 3);
        assert_eq!(logs.count_with_status(DeliveryStatus::Sent), 3);
        assert_eq!(logs.count_with_status(DeliveryStatus::Pending), 0);
    }

    #[tokio::test]
    async fn empty_queue_is_a_noop() {
        let logs = Arc::new(MockLogRepository::with_pending(0));
        let accounts = Arc::new(MockAccountRepository::with_accounts(vec![account()]));
        let channel = Arc::new(MockChannel::with_status(ConnectionStatus::Connected));
        let pass = PendingRetryPass::new(logs, accounts, channel, 50);

        assert_eq!(pass.run().await.unwrap(), RetryStats::default());
    }

    #[tokio::test]
    async fn stale_disconnected_account_stops_batch_and_is_flagged() {
        let logs = Arc::new(MockLogRepository::with_pending(4));
        let a = account();
        let id = a.id;
        let accounts = Arc::new(MockAccountRepository::with_accounts(vec![a]));
        // Repository says connected; the bridge disagrees.
        let channel = Arc::new(MockChannel::with_status(ConnectionStatus::Disconnected));
        let pass = PendingRetryPass::new(logs.clone(), accounts.clone(), channel.clone(), 50);

        let stats = pass.run().await.unwrap();

        assert_eq!(stats.sent, 0);
        assert_eq!(stats.left_pending, 4);
        assert_eq!(*channel.sent.lock().unwrap(), 0);
        assert_eq!(
            accounts.connection_of(&id),
            Some(ConnectionStatus::Disconnected)
        );
        // Entries remain queued for the next pass.
        assert_eq!(logs.count_with_status(DeliveryStatus::Pending), 4);
    }

    #[tokio::test]
    async fn no_account_leaves_everything_pending() {
        let logs = Arc::new(MockLogRepository::with_pending(2));
        let accounts = Arc::new(MockAccountRepository::with_accounts(vec![]));
        let channel = Arc::new(MockChannel::with_status(ConnectionStatus::Connected));
        let pass = PendingRetryPass::new(logs.clone(), accounts, channel, 50);

        let stats = pass.run().await.unwrap();

        assert_eq!(stats.left_pending, 2);
        assert_eq!(logs.count_with_status(DeliveryStatus::Pending), 2);
    }

    #[tokio::test]
    async fn batch_respects_the_hourly_quota() {
        let logs = Arc::new(MockLogRepository::with_pending(3));
        let mut a = account();
        a.hourly_limit = 1;
        let id = a.id;
        let accounts = Arc::new(MockAccountRepository::with_accounts(vec![a]));
        let channel = Arc::new(MockChannel::with_status(ConnectionStatus::Connected));
        let pass = PendingRetryPass::new(logs.clone(), accounts.clone(), channel.clone(), 50);

        let stats = pass.run().await.unwrap();

        // One send consumes the account's last quota slot; the rest wait.
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.left_pending, 2);
        assert_eq!(*channel.sent.lock().unwrap(), 1);
        assert_eq!(logs.count_with_status(DeliveryStatus::Pending), 2);
        let sent_this_hour = accounts
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.sent_this_hour);
        assert_eq!(sent_this_hour, Some(1));
    }

    #[tokio::test]
    async fn exhausted_account_rotates_to_the_next_one() {
        let logs = Arc::new(MockLogRepository::with_pending(3));
        let mut first = account();
        first.hourly_limit = 1;
        let mut second = account();
        second.name = "notify-02".to_string();
        second.hourly_limit = 1;
        let accounts = Arc::new(MockAccountRepository::with_accounts(vec![first, second]));
        let channel = Arc::new(MockChannel::with_status(ConnectionStatus::Connected));
        let pass = PendingRetryPass::new(logs.clone(), accounts, channel, 50);

        let stats = pass.run().await.unwrap();

        assert_eq!(stats.sent, 2);
        assert_eq!(stats.left_pending, 1);
        assert_eq!(logs.count_with_status(DeliveryStatus::Sent), 2);
    }

    #[tokio::test]
    async fn batch_size_caps_the_scan() {
        let logs = Arc::new(MockLogRepository::with_pending(5));
        let accounts = Arc::new(MockAccountRepository::with_accounts(vec![account()]));
        let channel = Arc::new(MockChannel::with_status(ConnectionStatus::Connected));
        let pass = PendingRetryPass::new(logs.clone(), accounts, channel, 2);

        let stats = pass.run().await.unwrap();

        assert_eq!(stats.scanned, 2);
        assert_eq!(logs.count_with_status(DeliveryStatus::Pending), 3);
    }
}
