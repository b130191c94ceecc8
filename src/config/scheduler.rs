//! Scheduler configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::SchedulerIntervals;

/// Scheduler loop intervals, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Reminder and failed-payment pass interval
    #[serde(default = "default_reminder_secs")]
    pub reminder_secs: u64,

    /// Gateway reconciliation pass interval
    #[serde(default = "default_reconcile_secs")]
    pub reconcile_secs: u64,

    /// Pending notification retry pass interval
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
}

impl SchedulerConfig {
    pub fn intervals(&self) -> SchedulerIntervals {
        SchedulerIntervals {
            reminder_secs: self.reminder_secs,
            reconcile_secs: self.reconcile_secs,
            retry_secs: self.retry_secs,
        }
    }

    /// Validate scheduler configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reminder_secs == 0 || self.reconcile_secs == 0 || self.retry_secs == 0 {
            return Err(ValidationError::InvalidSchedulerInterval);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reminder_secs: default_reminder_secs(),
            reconcile_secs: default_reconcile_secs(),
            retry_secs: default_retry_secs(),
        }
    }
}

fn default_reminder_secs() -> u64 {
    3_600
}

fn default_reconcile_secs() -> u64 {
    1_800
}

fn default_retry_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.reminder_secs, 3_600);
        assert_eq!(config.reconcile_secs, 1_800);
        assert_eq!(config.retry_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SchedulerConfig {
            retry_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
