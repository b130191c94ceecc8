//! Scheduler driver.
//!
//! Owns the three periodic loops: hourly expiration reminders (and the
//! failed-payment ladder), the half-hourly gateway reconciliation, and the
//! per-minute pending-notification retry. Each loop awaits its job inline
//! before the next tick, so a slow pass can never overlap itself; missed
//! ticks are delayed rather than burst.
//!
//! Every loop fires once immediately on start, so a restarted process
//! catches up without waiting a full period. Stop is graceful: the loops
//! are signalled and exit on their own after any in-flight pass completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::application::dispatch::PendingRetryPass;
use crate::application::reconciliation::GatewayReconciler;
use crate::application::reminders::{ExpirationReminderJob, FailedPaymentSequencer};
use crate::domain::foundation::Timestamp;

/// Loop periods in seconds.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerIntervals {
    pub reminder_secs: u64,
    pub reconcile_secs: u64,
    pub retry_secs: u64,
}

impl Default for SchedulerIntervals {
    fn default() -> Self {
        Self {
            reminder_secs: 3_600,
            reconcile_secs: 1_800,
            retry_secs: 60,
        }
    }
}

/// Snapshot of the scheduler for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_reminder_run: Option<Timestamp>,
    pub next_reminder_in_minutes: Option<i64>,
}

struct SchedulerState {
    running: AtomicBool,
    last_reminder_run: Mutex<Option<Timestamp>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

/// Drives the periodic jobs.
pub struct Scheduler {
    reminders: Arc<ExpirationReminderJob>,
    sequencer: Arc<FailedPaymentSequencer>,
    reconciler: Arc<GatewayReconciler>,
    retry: Arc<PendingRetryPass>,
    intervals: SchedulerIntervals,
    state: Arc<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        reminders: Arc<ExpirationReminderJob>,
        sequencer: Arc<FailedPaymentSequencer>,
        reconciler: Arc<GatewayReconciler>,
        retry: Arc<PendingRetryPass>,
        intervals: SchedulerIntervals,
    ) -> Self {
        Self {
            reminders,
            sequencer,
            reconciler,
            retry,
            intervals,
            state: Arc::new(SchedulerState {
                running: AtomicBool::new(false),
                last_reminder_run: Mutex::new(None),
                handles: Mutex::new(Vec::new()),
                shutdown: watch::channel(false).0,
            }),
        }
    }

    /// Starts the three loops. Calling start on a running scheduler is a
    /// no-op.
    pub fn start(&self) {
        if self.state.running.swap(true, Ordering::SeqCst) {
            warn!("scheduler already running, ignoring start");
            return;
        }
        info!(
            reminder_secs = self.intervals.reminder_secs,
            reconcile_secs = self.intervals.reconcile_secs,
            retry_secs = self.intervals.retry_secs,
            "starting scheduler"
        );
        self.state.shutdown.send_replace(false);

        let mut handles = self.state.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.push(self.spawn_reminder_loop());
        handles.push(self.spawn_reconcile_loop());
        handles.push(self.spawn_retry_loop());
    }

    /// Stops the loops. An in-flight job pass runs to completion; its
    /// results are simply not acted on further. The loop tasks exit on
    /// their own once signalled.
    pub fn stop(&self) {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("stopping scheduler");
        self.state.shutdown.send_replace(true);
        let mut handles = self.state.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.clear();
    }

    pub fn status(&self) -> SchedulerStatus {
        let running = self.state.running.load(Ordering::SeqCst);
        let last_reminder_run = *self
            .state
            .last_reminder_run
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let next_reminder_in_minutes = match (running, last_reminder_run) {
            (true, Some(last)) => {
                let period_mins = self.intervals.reminder_secs as i64 / 60;
                let elapsed = Timestamp::now().duration_since(&last).num_minutes();
                Some((period_mins - elapsed).max(0))
            }
            _ => None,
        };
        SchedulerStatus {
            running,
            last_reminder_run,
            next_reminder_in_minutes,
        }
    }

    fn spawn_reminder_loop(&self) -> JoinHandle<()> {
        let reminders = self.reminders.clone();
        let sequencer = self.sequencer.clone();
        let state = self.state.clone();
        let mut shutdown = self.state.shutdown.subscribe();
        let period = Duration::from_secs(self.intervals.reminder_secs);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if !state.running.load(Ordering::SeqCst) {
                    break;
                }
                *state
                    .last_reminder_run
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(Timestamp::now());
                if let Err(e) = reminders.run().await {
                    error!(error = %e, "reminder tick failed");
                }
                if let Err(e) = sequencer.run().await {
                    error!(error = %e, "failed-payment ladder pass failed");
                }
            }
        })
    }

    fn spawn_reconcile_loop(&self) -> JoinHandle<()> {
        let reconciler = self.reconciler.clone();
        let state = self.state.clone();
        let mut shutdown = self.state.shutdown.subscribe();
        let period = Duration::from_secs(self.intervals.reconcile_secs);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if !state.running.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = reconciler.run().await {
                    error!(error = %e, "reconciliation pass failed");
                }
            }
        })
    }

    fn spawn_retry_loop(&self) -> JoinHandle<()> {
        let retry = self.retry.clone();
        let state = self.state.clone();
        let mut shutdown = self.state.shutdown.subscribe();
        let period = Duration::from_secs(self.intervals.retry_secs);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if !state.running.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = retry.run().await {
                    error!(error = %e, "notification retry pass failed");
                }
            }
        })
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
