//! Core ticket data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Status and action vocabulary
// ============================================================================

/// Lifecycle status of a maintenance ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Raised by an operator, nobody has picked it up yet.
    Pending,
    /// A technician is actively working the ticket.
    Doing,
    /// Work is paused pending a blocker (parts, another team, ...).
    Hold,
    /// Fixed (terminal).
    Done,
    /// Withdrawn (terminal).
    Cancelled,
}

impl TicketStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Pending,
        TicketStatus::Doing,
        TicketStatus::Hold,
        TicketStatus::Done,
        TicketStatus::Cancelled,
    ];

    /// Statuses shown on the active board.
    pub const OPEN: [TicketStatus; 3] =
        [TicketStatus::Pending, TicketStatus::Doing, TicketStatus::Hold];

    /// Statuses shown in history.
    pub const CLOSED: [TicketStatus; 2] = [TicketStatus::Done, TicketStatus::Cancelled];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Done | TicketStatus::Cancelled)
    }

    /// Returns true while a technician holds the ticket.
    pub fn is_active(&self) -> bool {
        matches!(self, TicketStatus::Doing | TicketStatus::Hold)
    }

    /// Returns the status as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "PENDING",
            TicketStatus::Doing => "DOING",
            TicketStatus::Hold => "HOLD",
            TicketStatus::Done => "DONE",
            TicketStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string that is not one of the five known statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ticket status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TicketStatus::Pending),
            "DOING" => Ok(TicketStatus::Doing),
            "HOLD" => Ok(TicketStatus::Hold),
            "DONE" => Ok(TicketStatus::Done),
            "CANCELLED" => Ok(TicketStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// The verb a technician applies to a ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    Doing,
    Hold,
    Done,
    Cancel,
}

impl TicketAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketAction::Doing => "doing",
            TicketAction::Hold => "hold",
            TicketAction::Done => "done",
            TicketAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TicketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ticket action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for TicketAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doing" => Ok(TicketAction::Doing),
            "hold" => Ok(TicketAction::Hold),
            "done" => Ok(TicketAction::Done),
            "cancel" => Ok(TicketAction::Cancel),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Where the problem is and what it looks like.
///
/// These values come from the factory's reference tables (lines, machines,
/// machine types, machine IDs, problems). The lifecycle engine never
/// interprets them; it only stores and returns them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Classification {
    /// Production line number (e.g. "BT03").
    pub line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    /// Free-text description from the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Classification {
    /// Create a classification for a line with no further detail.
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            ..Default::default()
        }
    }

    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    pub fn with_machine_type(mut self, machine_type: impl Into<String>) -> Self {
        self.machine_type = Some(machine_type.into());
        self
    }

    pub fn with_machine_id(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = Some(machine_id.into());
        self
    }

    pub fn with_problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = Some(problem.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trim every field and drop optional fields that end up empty.
    pub fn normalized(self) -> Self {
        Self {
            line: self.line.trim().to_string(),
            machine: clean(self.machine),
            machine_type: clean(self.machine_type),
            machine_id: clean(self.machine_id),
            problem: clean(self.problem),
            description: clean(self.description),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Ticket
// ============================================================================

/// A maintenance ticket raised against a line or machine.
///
/// Tickets are values: lifecycle transitions borrow the current ticket and
/// return a new one (see [`crate::ticket::TransitionError`] for rejections).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    /// Unique identifier (UUID).
    pub id: String,

    /// Operator who raised the ticket.
    pub requester: String,

    pub classification: Classification,

    pub status: TicketStatus,

    pub created_at: DateTime<Utc>,

    /// Set exactly once, by the terminal transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,

    /// Start of the currently open busy interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_started_at: Option<DateTime<Utc>>,

    /// Start of the currently open hold interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_started_at: Option<DateTime<Utc>>,

    /// Whole seconds spent in closed busy intervals.
    pub busy_seconds: u64,

    /// Whole seconds spent in closed hold intervals.
    pub hold_seconds: u64,

    /// Technician currently holding the ticket (DOING or HOLD only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_actor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<TicketAction>,

    /// Reason given for the most recent hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_by: Option<String>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a new PENDING ticket with zeroed accumulators.
    pub fn create(
        id: impl Into<String>,
        requester: impl Into<String>,
        classification: Classification,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            requester: requester.into(),
            classification: classification.normalized(),
            status: TicketStatus::Pending,
            created_at: now,
            closed_at: None,
            busy_started_at: None,
            hold_started_at: None,
            busy_seconds: 0,
            hold_seconds: 0,
            current_actor: None,
            last_action: None,
            hold_reason: None,
            solution: None,
            done_by: None,
            cancel_reason: None,
            canceled_by: None,
            updated_at: now,
        }
    }

    /// Returns true once the ticket is DONE or CANCELLED.
    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Who closed the ticket, whichever terminal transition it went through.
    pub fn closed_by(&self) -> Option<&str> {
        self.done_by.as_deref().or(self.canceled_by.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_flags() {
        assert!(!TicketStatus::Pending.is_terminal());
        assert!(!TicketStatus::Pending.is_active());
        assert!(TicketStatus::Doing.is_active());
        assert!(TicketStatus::Hold.is_active());
        assert!(TicketStatus::Done.is_terminal());
        assert!(TicketStatus::Cancelled.is_terminal());
        assert!(!TicketStatus::Cancelled.is_active());
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("doing".parse::<TicketStatus>().unwrap(), TicketStatus::Doing);
        assert_eq!(" HOLD ".parse::<TicketStatus>().unwrap(), TicketStatus::Hold);
        assert!("CLOSED".parse::<TicketStatus>().is_err());
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("Done".parse::<TicketAction>().unwrap(), TicketAction::Done);
        assert_eq!("cancel".parse::<TicketAction>().unwrap(), TicketAction::Cancel);
        let err = "restart".parse::<TicketAction>().unwrap_err();
        assert_eq!(err.to_string(), "unknown ticket action: restart");
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&TicketStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        let json = serde_json::to_string(&TicketAction::Hold).unwrap();
        assert_eq!(json, "\"hold\"");
    }

    #[test]
    fn test_classification_normalized() {
        let classification = Classification::new("  BT03 ")
            .with_machine("Wave Soldering ")
            .with_machine_id("   ")
            .with_description("");
        let normalized = classification.normalized();
        assert_eq!(normalized.line, "BT03");
        assert_eq!(normalized.machine.as_deref(), Some("Wave Soldering"));
        assert!(normalized.machine_id.is_none());
        assert!(normalized.description.is_none());
    }

    #[test]
    fn test_create_ticket_is_pending_with_zero_accumulators() {
        let now = Utc::now();
        let ticket = Ticket::create("t-1", "operator", Classification::new("BT01"), now);
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.busy_seconds, 0);
        assert_eq!(ticket.hold_seconds, 0);
        assert_eq!(ticket.created_at, now);
        assert!(ticket.closed_at.is_none());
        assert!(ticket.current_actor.is_none());
        assert!(!ticket.is_closed());
    }
}
