//! Time-related utilities with clock abstraction for testability.
//!
//! All timestamps handled by Sokdo are UTC microseconds since the Unix epoch.
//! On the wire they travel as RFC 3339 strings with microsecond precision.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp in UTC (microseconds)
    fn now_utc_micros(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc_micros(&self) -> i64 {
        get_utc_timestamp()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_micros: i64) -> Self {
        Self {
            fixed_time: fixed_time_micros,
        }
    }
}

impl Clock for FixedClock {
    fn now_utc_micros(&self) -> i64 {
        self.fixed_time
    }
}

/// Get current Unix timestamp in UTC (microseconds)
pub fn get_utc_timestamp() -> i64 {
    Utc::now().timestamp_micros()
}

/// Convert Unix timestamp (microseconds) to an RFC 3339 UTC string
///
/// Out-of-range values fall back to the Unix epoch.
pub fn timestamp_to_rfc3339(timestamp_micros: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(timestamp_micros)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp into Unix microseconds (UTC).
///
/// Accepts RFC 3339 (`Z` or a numeric offset) and naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` values, the latter read as UTC.
/// Returns `None` for anything else.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_micros());
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp_micros())
}

/// Format Unix timestamp (microseconds) for display in the local time zone
pub fn timestamp_to_local_display(timestamp_micros: i64) -> String {
    let utc = DateTime::<Utc>::from_timestamp_micros(timestamp_micros).unwrap_or_default();
    DateTime::<Local>::from(utc)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
