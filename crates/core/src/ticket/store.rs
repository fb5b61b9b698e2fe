//! Ticket storage trait and types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::AuthError;

use super::{Classification, Ticket, TicketStatus, TransitionError};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Ticket not found.
    #[error("Ticket not found: {0}")]
    NotFound(String),

    /// Acting technician could not be verified.
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// The lifecycle engine refused the transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Malformed create request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new ticket.
#[derive(Debug, Clone)]
pub struct CreateTicketRequest {
    /// Operator raising the ticket.
    pub requester: String,
    /// Where the problem is.
    pub classification: Classification,
}

impl CreateTicketRequest {
    pub fn new(requester: impl Into<String>, classification: Classification) -> Self {
        Self {
            requester: requester.into(),
            classification,
        }
    }
}

/// Result ordering for [`TicketFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketOrder {
    /// Newest created first.
    #[default]
    CreatedDesc,
    /// Most recently closed first.
    ClosedDesc,
}

/// Filter for querying tickets.
#[derive(Debug, Clone)]
pub struct TicketFilter {
    /// Match any of these statuses (empty = all).
    pub statuses: Vec<TicketStatus>,
    /// Filter by requester.
    pub requester: Option<String>,
    /// Filter by production line.
    pub line: Option<String>,
    /// Filter by machine.
    pub machine: Option<String>,
    /// Created at or after.
    pub created_from: Option<DateTime<Utc>>,
    /// Created at or before.
    pub created_to: Option<DateTime<Utc>>,
    pub order: TicketOrder,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            statuses: Vec::new(),
            requester: None,
            line: None,
            machine: None,
            created_from: None,
            created_to: None,
            order: TicketOrder::CreatedDesc,
            limit: 100,
            offset: 0,
        }
    }

    /// Open tickets for the live board.
    pub fn active() -> Self {
        Self::new().with_statuses(TicketStatus::OPEN)
    }

    /// Closed tickets, most recently closed first.
    pub fn history() -> Self {
        Self::new()
            .with_statuses(TicketStatus::CLOSED)
            .with_order(TicketOrder::ClosedDesc)
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TicketStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }

    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    /// Restrict to tickets created in `[from, to]`.
    pub fn with_created_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn with_order(mut self, order: TicketOrder) -> Self {
        self.order = order;
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Transition callback run against the stored ticket under the store's write lock.
pub type TransitionFn<'a> = &'a dyn Fn(&Ticket) -> Result<Ticket, TransitionError>;

/// Trait for ticket storage backends.
pub trait TicketStore: Send + Sync {
    /// Create a new PENDING ticket stamped with `now`.
    fn create(&self, request: CreateTicketRequest, now: DateTime<Utc>)
        -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// List tickets matching the filter.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (ignores limit/offset).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// Load, transform and persist one ticket atomically.
    ///
    /// Concurrent calls for the same ticket are serialized; if `apply` fails
    /// nothing is written.
    fn transition(&self, id: &str, apply: TransitionFn<'_>) -> Result<Ticket, TicketError>;
}
