//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Negative if `other` is after `self`.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Whole hours elapsed from `other` to `self`.
    ///
    /// Truncates toward zero, so 19.5 elapsed hours reports 19.
    pub fn hours_since(&self, other: &Timestamp) -> i64 {
        self.duration_since(other).num_hours()
    }

    /// Whole days elapsed from `other` to `self`.
    pub fn days_since(&self, other: &Timestamp) -> i64 {
        self.duration_since(other).num_days()
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    pub fn minus_days(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }

    /// Creates a new timestamp by adding the specified number of hours.
    pub fn plus_hours(&self, hours: i64) -> Self {
        Self(self.0 + Duration::hours(hours))
    }

    /// Creates a new timestamp by subtracting the specified number of hours.
    pub fn minus_hours(&self, hours: i64) -> Self {
        Self(self.0 - Duration::hours(hours))
    }

    /// Creates a new timestamp by adding the specified number of minutes.
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 + Duration::minutes(minutes))
    }

    /// Returns the start of the calendar day containing this timestamp (00:00:00 UTC).
    pub fn start_of_day(&self) -> Self {
        let start = self
            .0
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();
        Self(start)
    }

    /// Creates a timestamp from Unix seconds.
    pub fn from_unix_secs(secs: i64) -> Self {
        use chrono::TimeZone;
        Self(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn fixed(s: &str) -> Timestamp {
        Timestamp::from_datetime(
            DateTime::parse_from_rfc3339(s)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn hours_since_truncates_toward_zero() {
        let earlier = fixed("2024-01-15T10:00:00Z");
        let later = fixed("2024-01-16T05:30:00Z");
        assert_eq!(later.hours_since(&earlier), 19);
    }

    #[test]
    fn hours_since_is_negative_for_reversed_order() {
        let earlier = fixed("2024-01-15T10:00:00Z");
        let later = fixed("2024-01-15T15:00:00Z");
        assert_eq!(earlier.hours_since(&later), -5);
    }

    #[test]
    fn start_of_day_drops_time_component() {
        let ts = fixed("2024-01-15T18:45:12Z");
        let start = ts.start_of_day();
        assert_eq!(start, fixed("2024-01-15T00:00:00Z"));
        assert_eq!(start.as_datetime().day(), 15);
    }

    #[test]
    fn plus_and_minus_days_are_inverse() {
        let ts = fixed("2024-01-15T10:00:00Z");
        assert_eq!(ts.plus_days(3).minus_days(3), ts);
    }

    #[test]
    fn hour_arithmetic_crosses_day_boundary() {
        let ts = fixed("2024-01-15T23:00:00Z");
        assert_eq!(ts.plus_hours(2), fixed("2024-01-16T01:00:00Z"));
    }

    #[test]
    fn unix_secs_roundtrips() {
        let ts = Timestamp::from_unix_secs(1705276800);
        assert_eq!(ts.as_unix_secs(), 1705276800);
        assert_eq!(ts.as_datetime().year(), 2024);
    }

    #[test]
    fn ordering_works() {
        let a = fixed("2024-01-15T10:00:00Z");
        let b = fixed("2024-01-15T11:00:00Z");
        assert!(a < b);
        assert!(a.is_before(&b));
        assert!(b.is_after(&a));
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let ts = fixed("2024-01-15T10:30:00Z");
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15"));
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
