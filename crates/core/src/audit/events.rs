use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::{TicketAction, TicketStatus};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketCreated {
        ticket_id: String,
        requester: String,
        line: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        machine: Option<String>,
    },

    /// A lifecycle transition was applied.
    TicketTransitioned {
        ticket_id: String,
        actor: String,
        action: TicketAction,
        from_status: TicketStatus,
        to_status: TicketStatus,
        /// Hold or cancel reason, when the action carried one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        solution: Option<String>,
        /// Accumulators after the transition.
        busy_seconds: u64,
        hold_seconds: u64,
    },

    /// A transition was refused by the lifecycle engine or the authorizer.
    TransitionRejected {
        ticket_id: String,
        actor: String,
        action: TicketAction,
        /// `invalid_state`, `ownership_conflict`, `validation` or `unauthorized`.
        kind: String,
        message: String,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketTransitioned { .. } => "ticket_transitioned",
            Self::TransitionRejected { .. } => "transition_rejected",
        }
    }

    /// Extract ticket_id if this event is ticket-related
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::TicketCreated { ticket_id, .. }
            | Self::TicketTransitioned { ticket_id, .. }
            | Self::TransitionRejected { ticket_id, .. } => Some(ticket_id),
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }

    /// Extract user_id if this event was triggered by a user action
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::TicketCreated { requester, .. } => Some(requester),
            Self::TicketTransitioned { actor, .. } | Self::TransitionRejected { actor, .. } => {
                Some(actor)
            }
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<String>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transitioned() -> AuditEvent {
        AuditEvent::TicketTransitioned {
            ticket_id: "ticket-123".to_string(),
            actor: "alice".to_string(),
            action: TicketAction::Hold,
            from_status: TicketStatus::Doing,
            to_status: TicketStatus::Hold,
            reason: Some("waiting parts".to_string()),
            solution: None,
            busy_seconds: 60,
            hold_seconds: 0,
        }
    }

    #[test]
    fn test_event_type_service_started() {
        let event = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        };
        assert_eq!(event.event_type(), "service_started");
        assert_eq!(event.ticket_id(), None);
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_event_type_ticket_created() {
        let event = AuditEvent::TicketCreated {
            ticket_id: "ticket-123".to_string(),
            requester: "operator-7".to_string(),
            line: "BT03".to_string(),
            machine: None,
        };
        assert_eq!(event.event_type(), "ticket_created");
        assert_eq!(event.ticket_id(), Some("ticket-123"));
        assert_eq!(event.user_id(), Some("operator-7"));
    }

    #[test]
    fn test_event_type_ticket_transitioned() {
        let event = transitioned();
        assert_eq!(event.event_type(), "ticket_transitioned");
        assert_eq!(event.ticket_id(), Some("ticket-123"));
        assert_eq!(event.user_id(), Some("alice"));
    }

    #[test]
    fn test_event_type_transition_rejected() {
        let event = AuditEvent::TransitionRejected {
            ticket_id: "ticket-123".to_string(),
            actor: "bob".to_string(),
            action: TicketAction::Done,
            kind: "ownership_conflict".to_string(),
            message: "Ticket is held by alice, not bob".to_string(),
        };
        assert_eq!(event.event_type(), "transition_rejected");
        assert_eq!(event.user_id(), Some("bob"));
    }

    #[test]
    fn test_transitioned_json_shape() {
        let json = serde_json::to_value(transitioned()).unwrap();
        assert_eq!(json["type"], "ticket_transitioned");
        assert_eq!(json["action"], "hold");
        assert_eq!(json["from_status"], "DOING");
        assert_eq!(json["to_status"], "HOLD");
        assert!(json.get("solution").is_none());

        let back: AuditEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "ticket_transitioned");
    }

    #[test]
    fn test_audit_record_serialize() {
        let record = AuditRecord {
            id: 1,
            timestamp: Utc::now(),
            event_type: "service_started".to_string(),
            ticket_id: None,
            user_id: None,
            data: AuditEvent::ServiceStarted {
                version: "0.1.0".to_string(),
                config_hash: "abc123".to_string(),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"event_type\":\"service_started\""));
    }
}
