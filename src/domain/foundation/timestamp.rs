//! UTC instants for subscription expiry and record bookkeeping.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a timestamp from Unix seconds, `None` when out of range.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Parses an RFC 3339 string such as `2026-01-15T10:30:00Z`.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Strict: an expiry equal to `now` has not lapsed yet.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        other.is_before(self)
    }

    pub fn add_days(&self, days: i64) -> Self {
        self.shifted(Duration::days(days))
    }

    pub fn minus_days(&self, days: i64) -> Self {
        self.shifted(-Duration::days(days))
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        self.shifted(Duration::seconds(secs))
    }

    fn shifted(&self, by: Duration) -> Self {
        Self(self.0 + by)
    }

    /// Returns a timestamp strictly later than `previous`.
    ///
    /// Wall clocks may stall or step backwards between two writes; record
    /// modification times must still move forward.
    pub fn advanced_past(previous: &Timestamp) -> Self {
        let now = Utc::now();
        if now > previous.0 {
            Self(now)
        } else {
            Self(previous.0 + Duration::microseconds(1))
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}
