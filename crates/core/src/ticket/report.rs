//! Derived reporting values for closed tickets.

use serde::{Deserialize, Serialize};

use super::Ticket;

/// Time breakdown of a closed ticket.
///
/// `waiting_seconds` is the part of the ticket's life that was neither busy
/// nor on hold, i.e. how long it sat in the queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketReport {
    pub waiting_seconds: u64,
    pub total_seconds: u64,
    pub busy_seconds: u64,
    pub hold_seconds: u64,
}

impl Ticket {
    /// Time breakdown, or `None` while the ticket is still open.
    pub fn report(&self) -> Option<TicketReport> {
        let closed_at = self.closed_at?;
        // Transitions keep closed_at >= created_at; the clamp only guards rows edited outside the engine.
        let total_seconds = u64::try_from((closed_at - self.created_at).num_seconds()).unwrap_or(0);
        let waiting_seconds = total_seconds
            .saturating_sub(self.busy_seconds)
            .saturating_sub(self.hold_seconds);
        Some(TicketReport {
            waiting_seconds,
            total_seconds,
            busy_seconds: self.busy_seconds,
            hold_seconds: self.hold_seconds,
        })
    }
}

/// Render seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::Classification;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_open_ticket_has_no_report() {
        let now = Utc::now();
        let ticket = Ticket::create("t", "op", Classification::new("BT01"), now);
        assert!(ticket.report().is_none());

        let doing = ticket.start_doing("alice", now).unwrap();
        assert!(doing.report().is_none());
    }

    #[test]
    fn test_waiting_time_never_negative() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut ticket = Ticket::create("t", "op", Classification::new("BT01"), created)
            .cancel("op", created + Duration::seconds(30), Some("dup"))
            .unwrap();
        // Imported data can carry accumulators larger than the ticket lifetime.
        ticket.busy_seconds = 100;

        let report = ticket.report().unwrap();
        assert_eq!(report.total_seconds, 30);
        assert_eq!(report.waiting_seconds, 0);
        assert_eq!(report.busy_seconds, 100);
    }

    #[test]
    fn test_cancelled_pending_ticket_is_all_waiting() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let ticket = Ticket::create("t", "op", Classification::new("BT01"), created)
            .cancel("op", created + Duration::minutes(5), Some("dup"))
            .unwrap();
        let report = ticket.report().unwrap();
        assert_eq!(report.waiting_seconds, 300);
        assert_eq!(report.total_seconds, 300);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(100 * 3600 + 5), "100:00:05");
    }
}
