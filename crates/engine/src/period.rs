//! Monthly ledger partitions.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::EngineError;

const PERIOD_FORMAT: &str = "%Y-%m";

/// Maps instants to the period sheet they belong to, in a fixed timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodClock {
    timezone: Tz,
}

impl Default for PeriodClock {
    fn default() -> Self {
        Self { timezone: Tz::UTC }
    }
}

impl PeriodClock {
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Builds a clock from an IANA name such as `Asia/Taipei`.
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| EngineError::Config(format!("unknown timezone \"{name}\"")))
    }

    /// Sheet title of the calendar month containing `now`, e.g. `2026-10`.
    #[must_use]
    pub fn period_key(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.timezone)
            .format(PERIOD_FORMAT)
            .to_string()
    }

    /// Local wall-clock time written in the `CreatedAt` column.
    #[must_use]
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.timezone).naive_local()
    }
}
