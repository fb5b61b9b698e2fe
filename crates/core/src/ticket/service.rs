//! Ticket service: authorization, clock, persistence, audit and metrics
//! wrapped around the lifecycle engine.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::ActorAuthorizer;
use crate::clock::Clock;
use crate::metrics;

use super::{
    CreateTicketRequest, Ticket, TicketAction, TicketError, TicketFilter, TicketReport,
    TicketStatus, TicketStore, TransitionError, TransitionRequest,
};

/// A technician's request to move a ticket along its lifecycle.
#[derive(Clone, Deserialize)]
pub struct ActionRequest {
    pub action: TicketAction,
    /// Technician performing the action.
    pub actor: String,
    /// Credential checked by the configured authorizer.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
}

impl ActionRequest {
    pub fn new(action: TicketAction, actor: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            action,
            actor: actor.into(),
            password: password.into(),
            reason: None,
            solution: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }

    fn transition(&self) -> TransitionRequest {
        TransitionRequest {
            action: self.action,
            reason: self.reason.clone(),
            solution: self.solution.clone(),
        }
    }
}

impl fmt::Debug for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRequest")
            .field("action", &self.action)
            .field("actor", &self.actor)
            .field("reason", &self.reason)
            .field("solution", &self.solution)
            .finish_non_exhaustive()
    }
}

/// A closed ticket paired with its time breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ClosedTicket {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub report: TicketReport,
}

/// Entry point for everything that reads or changes tickets.
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    authorizer: Arc<dyn ActorAuthorizer>,
    clock: Arc<dyn Clock>,
    audit: Option<AuditHandle>,
    active_version: AtomicU64,
}

impl TicketService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        authorizer: Arc<dyn ActorAuthorizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            authorizer,
            clock,
            audit: None,
            active_version: AtomicU64::new(0),
        }
    }

    /// Emit audit events through `audit`.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Counter that increases whenever the active board changes.
    ///
    /// Clients poll it and reload only when it moves.
    pub fn active_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    fn bump_active_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }

    /// Raise a new PENDING ticket.
    pub async fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        let requester = request.requester.trim().to_string();
        if requester.is_empty() {
            return Err(TicketError::InvalidRequest("requester is required".to_string()));
        }
        let classification = request.classification.normalized();
        if classification.line.is_empty() {
            return Err(TicketError::InvalidRequest("line is required".to_string()));
        }

        let now = self.clock.now();
        let ticket = self
            .store
            .create(CreateTicketRequest::new(requester, classification), now)?;

        metrics::TICKETS_CREATED.inc();
        self.bump_active_version();

        tracing::info!(
            ticket_id = %ticket.id,
            requester = %ticket.requester,
            line = %ticket.classification.line,
            "Ticket created"
        );

        self.emit(AuditEvent::TicketCreated {
            ticket_id: ticket.id.clone(),
            requester: ticket.requester.clone(),
            line: ticket.classification.line.clone(),
            machine: ticket.classification.machine.clone(),
        })
        .await;

        Ok(ticket)
    }

    /// Verify the actor and apply one lifecycle action to ticket `id`.
    ///
    /// The clock is read once; that instant closes and opens intervals and
    /// stamps the ticket.
    pub async fn perform(&self, id: &str, request: ActionRequest) -> Result<Ticket, TicketError> {
        let actor = request.actor.trim().to_string();
        if actor.is_empty() {
            return Err(TransitionError::Validation { field: "actor" }.into());
        }

        if let Err(e) = self.authorizer.verify(&actor, &request.password).await {
            tracing::warn!(ticket_id = %id, actor = %actor, action = %request.action, "Actor rejected: {}", e);
            metrics::TRANSITION_REJECTIONS
                .with_label_values(&[request.action.as_str(), "unauthorized"])
                .inc();
            self.emit(AuditEvent::TransitionRejected {
                ticket_id: id.to_string(),
                actor: actor.clone(),
                action: request.action,
                kind: "unauthorized".to_string(),
                message: e.to_string(),
            })
            .await;
            return Err(e.into());
        }

        let transition = request.transition();
        let now = self.clock.now();
        let from_status: Cell<Option<TicketStatus>> = Cell::new(None);

        let result = self.store.transition(id, &|current| {
            from_status.set(Some(current.status));
            current.apply(&transition, &actor, now)
        });

        match result {
            Ok(ticket) => {
                self.record_applied(&ticket, from_status.get(), &actor, &transition)
                    .await;
                Ok(ticket)
            }
            Err(TicketError::Transition(e)) => {
                tracing::warn!(
                    ticket_id = %id,
                    actor = %actor,
                    action = %transition.action,
                    kind = e.kind(),
                    "Transition rejected: {}", e
                );
                metrics::TRANSITION_REJECTIONS
                    .with_label_values(&[transition.action.as_str(), e.kind()])
                    .inc();
                self.emit(AuditEvent::TransitionRejected {
                    ticket_id: id.to_string(),
                    actor,
                    action: transition.action,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                })
                .await;
                Err(TicketError::Transition(e))
            }
            Err(e) => Err(e),
        }
    }

    async fn record_applied(
        &self,
        ticket: &Ticket,
        from_status: Option<TicketStatus>,
        actor: &str,
        transition: &TransitionRequest,
    ) {
        metrics::TRANSITIONS
            .with_label_values(&[transition.action.as_str(), ticket.status.as_str()])
            .inc();
        if let Some(report) = ticket.report() {
            metrics::observe_closed(ticket, &report);
        }
        self.bump_active_version();

        tracing::info!(
            ticket_id = %ticket.id,
            actor = %actor,
            action = %transition.action,
            status = %ticket.status,
            busy_seconds = ticket.busy_seconds,
            hold_seconds = ticket.hold_seconds,
            "Ticket transitioned"
        );

        self.emit(AuditEvent::TicketTransitioned {
            ticket_id: ticket.id.clone(),
            actor: actor.to_string(),
            action: transition.action,
            from_status: from_status.unwrap_or(ticket.status),
            to_status: ticket.status,
            reason: match transition.action {
                TicketAction::Hold => ticket.hold_reason.clone(),
                TicketAction::Cancel => ticket.cancel_reason.clone(),
                TicketAction::Doing | TicketAction::Done => None,
            },
            solution: ticket.solution.clone(),
            busy_seconds: ticket.busy_seconds,
            hold_seconds: ticket.hold_seconds,
        })
        .await;
    }

    /// Get a ticket by ID.
    pub fn get(&self, id: &str) -> Result<Ticket, TicketError> {
        self.store
            .get(id)?
            .ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    /// Open tickets matching `filter`; any status restriction in `filter` is replaced.
    pub fn list_active(&self, filter: TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        self.store
            .list(&filter.with_statuses(TicketStatus::OPEN))
    }

    /// Count tickets matching `filter` exactly as given.
    pub fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        self.store.count(filter)
    }

    pub fn count_active(&self, filter: TicketFilter) -> Result<i64, TicketError> {
        self.store
            .count(&filter.with_statuses(TicketStatus::OPEN))
    }

    /// Closed tickets with their reports, most recently closed first.
    pub fn history(&self, filter: TicketFilter) -> Result<Vec<ClosedTicket>, TicketError> {
        let filter = filter
            .with_statuses(TicketStatus::CLOSED)
            .with_order(super::TicketOrder::ClosedDesc);
        let tickets = self.store.list(&filter)?;
        Ok(tickets
            .into_iter()
            .filter_map(|ticket| {
                let report = ticket.report()?;
                Some(ClosedTicket { ticket, report })
            })
            .collect())
    }

    pub fn count_history(&self, filter: TicketFilter) -> Result<i64, TicketError> {
        self.store
            .count(&filter.with_statuses(TicketStatus::CLOSED))
    }

    /// Time breakdown for ticket `id`; `None` while it is still open.
    pub fn report(&self, id: &str) -> Result<Option<TicketReport>, TicketError> {
        Ok(self.get(id)?.report())
    }
}
