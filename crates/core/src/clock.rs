//! Time source for lifecycle transitions.

use chrono::{DateTime, Utc};

/// Supplies "now" to the ticket service.
///
/// Each operation reads the clock once and passes that instant through every
/// step, so a single action never observes two different times.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
