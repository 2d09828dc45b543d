use std::fmt::Display;
use std::ops::{Add, Sub};

use tokio::task_local;

use super::Duration;

task_local! {
    /// Pins `DateTime::now()` for everything running inside the scope.
    pub static FIXED_NOW: DateTime;
}

/// Wall-clock timestamp in local time. Serialized as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DateTime {
    delegate: chrono::DateTime<chrono::Local>,
}

impl DateTime {
    pub fn now() -> Self {
        FIXED_NOW
            .try_with(|t| *t)
            .unwrap_or_else(|_| chrono::Local::now().into())
    }

    pub fn from_iso(iso8601: &str) -> anyhow::Result<Self> {
        Ok(chrono::DateTime::parse_from_rfc3339(iso8601)?.into())
    }

    /// Console rendering used by event records.
    pub fn format_local(&self) -> String {
        self.delegate.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Negative when `since` lies after `self`.
    pub fn elapsed_since(&self, since: Self) -> Duration {
        Duration::new(self.delegate - since.delegate)
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.delegate.to_rfc3339())
    }
}

impl Add<Duration> for DateTime {
    type Output = DateTime;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            delegate: self.delegate + rhs.delegate,
        }
    }
}

impl Sub<Duration> for DateTime {
    type Output = DateTime;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self {
            delegate: self.delegate - rhs.delegate,
        }
    }
}

impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for DateTime {
    fn from(val: chrono::DateTime<T>) -> Self {
        Self {
            delegate: val.with_timezone(&chrono::Local),
        }
    }
}
