//! Shared primitive types used across the grievance core.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Every timestamp in the core is UTC; local calendars are applied only when reporting.
pub type Timestamp = DateTime<Utc>;

/// A stable, unique identifier for any entity in the portal.
pub type EntityId = String;

pub type ComplaintId = EntityId;
pub type AuthorityId = EntityId;
pub type DepartmentId = EntityId;

/// Storage representation: epoch milliseconds.
pub fn to_millis(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

pub fn from_millis(ms: i64) -> Option<Timestamp> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Fractional days between two instants (negative when `to` precedes `from`).
pub fn days_between(from: Timestamp, to: Timestamp) -> f64 {
    (to - from).num_milliseconds() as f64 / Duration::days(1).num_milliseconds() as f64
}
