//! Absolute wall-clock windows for expiration queries.
//!
//! Each scheduler tick computes its windows once, so slow-running batches
//! all query against the same bounds and do not drift. The four constructors
//! here correspond to the four expiration query shapes: expiring on a future
//! day, expiring within the next hours, expired within the last hours, and
//! expired yesterday.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Half-open wall-clock window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryWindow {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl ExpiryWindow {
    /// Day-granularity window covering the calendar day `days_ahead` days
    /// from `now`.
    pub fn day_ahead(now: Timestamp, days_ahead: i64) -> Self {
        let day_start = now.start_of_day().plus_days(days_ahead);
        Self {
            from: day_start,
            to: day_start.plus_days(1),
        }
    }

    /// Hour-granularity window covering the next `hours` hours from `now`.
    pub fn hours_ahead(now: Timestamp, hours: i64) -> Self {
        Self {
            from: now,
            to: now.plus_hours(hours),
        }
    }

    /// Hour-granularity window covering the last `hours` hours before `now`.
    pub fn hours_back(now: Timestamp, hours: i64) -> Self {
        Self {
            from: now.minus_hours(hours),
            to: now,
        }
    }

    /// Day-granularity window covering the full calendar day before `now`.
    pub fn yesterday(now: Timestamp) -> Self {
        let today_start = now.start_of_day();
        Self {
            from: today_start.minus_days(1),
            to: today_start,
        }
    }

    /// Whether `ts` falls inside the window.
    pub fn contains(&self, ts: Timestamp) -> bool {
        !ts.is_before(&self.from) && ts.is_before(&self.to)
    }
}
