//! UTC instant used for every recorded money movement.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

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

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self < other
    }

    /// Negative when `earlier` is actually later.
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        self.0.signed_duration_since(earlier.0)
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Cutoffs for "older than N seconds" queries.
    pub fn minus_secs(&self, secs: i64) -> Self {
        self.plus_secs(-secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_arithmetic() {
        let now = Timestamp::now();
        let cutoff = now.minus_secs(900);

        assert!(cutoff.is_before(&now));
        assert_eq!(now.duration_since(&cutoff).num_seconds(), 900);
        assert_eq!(cutoff.duration_since(&now).num_seconds(), -900);
        assert_eq!(cutoff.plus_secs(900), now);
    }

    #[test]
    fn serializes_as_rfc3339() {
        let ts = Timestamp::from_datetime(
            DateTime::parse_from_rfc3339("2025-03-01T10:15:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );

        assert_eq!(serde_json::to_value(ts).unwrap(), "2025-03-01T10:15:00Z");
        assert_eq!(ts.to_string(), "2025-03-01T10:15:00+00:00");
    }
}
