//! Controllable clock for tests.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

/// A [`Clock`] that only moves when told to.
///
/// ```rust,ignore
/// let clock = ManualClock::default();
/// clock.advance(Duration::seconds(60));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(super::fixtures::epoch())
    }
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Jump to `instant` (may move backwards).
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.write() {
            *now = instant;
        }
    }

    /// Move forward by `by` (negative durations move backwards).
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.write() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .read()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}
