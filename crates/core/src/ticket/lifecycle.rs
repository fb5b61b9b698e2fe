//! Ticket lifecycle transitions and elapsed-time accounting.
//!
//! Every transition borrows the current ticket, runs all of its checks, and
//! only then builds the successor value. A rejected transition therefore
//! never leaves a half-updated ticket behind.
//!
//! Time is always supplied by the caller. `done` and `cancel` flush both
//! accumulators against the single `now` they were given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Ticket, TicketAction, TicketStatus};

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Wrong source state, terminal ticket, or re-entry into the current state.
    #[error("Cannot {action} ticket: current state is {status}")]
    InvalidStateTransition {
        action: TicketAction,
        status: TicketStatus,
    },

    /// Another technician currently holds the ticket.
    #[error("Ticket is held by {holder}, not {actor}")]
    OwnershipConflict { holder: String, actor: String },

    /// Required text was missing or blank.
    #[error("Missing required field: {field}")]
    Validation { field: &'static str },
}

impl TransitionError {
    /// Short machine-readable label (used for metrics and audit).
    pub fn kind(&self) -> &'static str {
        match self {
            TransitionError::InvalidStateTransition { .. } => "invalid_state",
            TransitionError::OwnershipConflict { .. } => "ownership_conflict",
            TransitionError::Validation { .. } => "validation",
        }
    }
}

/// A requested transition together with the text it may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub action: TicketAction,
    /// Hold or cancel reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Fix description for `done`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl TransitionRequest {
    pub fn doing() -> Self {
        Self {
            action: TicketAction::Doing,
            reason: None,
            solution: None,
        }
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: TicketAction::Hold,
            reason: Some(reason.into()),
            solution: None,
        }
    }

    pub fn done(solution: impl Into<String>) -> Self {
        Self {
            action: TicketAction::Done,
            reason: None,
            solution: Some(solution.into()),
        }
    }

    pub fn cancel(reason: impl Into<String>) -> Self {
        Self {
            action: TicketAction::Cancel,
            reason: Some(reason.into()),
            solution: None,
        }
    }
}

/// Whole seconds from `start` to `now`, never negative.
///
/// Transitions floor `now` at `updated_at`, so a negative span only shows up
/// when an open interval is inspected with an earlier instant.
fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - start).num_seconds()).unwrap_or(0)
}

/// Trimmed, non-empty text or a validation error naming `field`.
fn required_text(value: Option<&str>, field: &'static str) -> Result<String, TransitionError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(TransitionError::Validation { field }),
    }
}

impl Ticket {
    /// Seconds elapsed in whichever interval is currently open.
    pub fn open_interval_seconds(&self, now: DateTime<Utc>) -> u64 {
        let busy = self.busy_started_at.map_or(0, |s| elapsed_seconds(s, now));
        let hold = self.hold_started_at.map_or(0, |s| elapsed_seconds(s, now));
        busy + hold
    }

    /// Busy + hold time including the open interval, as of `now`.
    pub fn accounted_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.busy_seconds + self.hold_seconds + self.open_interval_seconds(now)
    }

    /// Close the open busy interval into `busy_seconds`. No-op when none is open.
    pub(crate) fn flush_busy(&mut self, now: DateTime<Utc>) {
        if let Some(start) = self.busy_started_at.take() {
            self.busy_seconds += elapsed_seconds(start, now);
        }
    }

    /// Close the open hold interval into `hold_seconds`. No-op when none is open.
    pub(crate) fn flush_hold(&mut self, now: DateTime<Utc>) {
        if let Some(start) = self.hold_started_at.take() {
            self.hold_seconds += elapsed_seconds(start, now);
        }
    }

    /// Transition instant, never earlier than the last recorded one.
    fn effective_now(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.updated_at)
    }

    fn reject(&self, action: TicketAction) -> TransitionError {
        TransitionError::InvalidStateTransition {
            action,
            status: self.status,
        }
    }

    /// One technician's claim on an active ticket cannot be taken over by another.
    fn check_owner(&self, actor: &str) -> Result<(), TransitionError> {
        if !self.status.is_active() {
            return Ok(());
        }
        match self.current_actor.as_deref() {
            Some(holder) if holder != actor => Err(TransitionError::OwnershipConflict {
                holder: holder.to_string(),
                actor: actor.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Start (or resume) work. Allowed from PENDING and HOLD.
    pub fn start_doing(&self, actor: &str, now: DateTime<Utc>) -> Result<Ticket, TransitionError> {
        match self.status {
            TicketStatus::Pending | TicketStatus::Hold => {}
            TicketStatus::Doing | TicketStatus::Done | TicketStatus::Cancelled => {
                return Err(self.reject(TicketAction::Doing));
            }
        }
        let actor = required_text(Some(actor), "actor")?;
        self.check_owner(&actor)?;

        let now = self.effective_now(now);
        let mut next = self.clone();
        next.flush_hold(now);
        next.busy_started_at = Some(now);
        next.status = TicketStatus::Doing;
        next.current_actor = Some(actor);
        next.last_action = Some(TicketAction::Doing);
        next.updated_at = now;
        Ok(next)
    }

    /// Pause work. Allowed from PENDING and DOING; a reason is required.
    pub fn start_hold(
        &self,
        actor: &str,
        now: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<Ticket, TransitionError> {
        match self.status {
            TicketStatus::Pending | TicketStatus::Doing => {}
            TicketStatus::Hold | TicketStatus::Done | TicketStatus::Cancelled => {
                return Err(self.reject(TicketAction::Hold));
            }
        }
        let actor = required_text(Some(actor), "actor")?;
        self.check_owner(&actor)?;
        let reason = required_text(reason, "reason")?;

        let now = self.effective_now(now);
        let mut next = self.clone();
        next.flush_busy(now);
        next.hold_started_at = Some(now);
        next.hold_reason = Some(reason);
        next.status = TicketStatus::Hold;
        next.current_actor = Some(actor);
        next.last_action = Some(TicketAction::Hold);
        next.updated_at = now;
        Ok(next)
    }

    /// Close the ticket as fixed. Allowed from DOING and HOLD; a solution is required.
    pub fn done(
        &self,
        actor: &str,
        now: DateTime<Utc>,
        solution: Option<&str>,
    ) -> Result<Ticket, TransitionError> {
        if !self.status.is_active() {
            return Err(self.reject(TicketAction::Done));
        }
        let actor = required_text(Some(actor), "actor")?;
        self.check_owner(&actor)?;
        let solution = required_text(solution, "solution")?;

        let now = self.effective_now(now);
        let mut next = self.clone();
        next.flush_busy(now);
        next.flush_hold(now);
        next.status = TicketStatus::Done;
        next.closed_at = Some(now);
        next.solution = Some(solution);
        next.done_by = Some(actor);
        next.current_actor = None;
        next.last_action = Some(TicketAction::Done);
        next.updated_at = now;
        Ok(next)
    }

    /// Withdraw the ticket from any non-terminal state; a reason is required.
    pub fn cancel(
        &self,
        actor: &str,
        now: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<Ticket, TransitionError> {
        if self.status.is_terminal() {
            return Err(self.reject(TicketAction::Cancel));
        }
        let actor = required_text(Some(actor), "actor")?;
        let reason = required_text(reason, "reason")?;

        let now = self.effective_now(now);
        let mut next = self.clone();
        next.flush_busy(now);
        next.flush_hold(now);
        next.status = TicketStatus::Cancelled;
        next.closed_at = Some(now);
        next.cancel_reason = Some(reason);
        next.canceled_by = Some(actor);
        next.current_actor = None;
        next.last_action = Some(TicketAction::Cancel);
        next.updated_at = now;
        Ok(next)
    }

    /// Dispatch a [`TransitionRequest`] to the matching transition.
    pub fn apply(
        &self,
        request: &TransitionRequest,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TransitionError> {
        match request.action {
            TicketAction::Doing => self.start_doing(actor, now),
            TicketAction::Hold => self.start_hold(actor, now, request.reason.as_deref()),
            TicketAction::Done => self.done(actor, now, request.solution.as_deref()),
            TicketAction::Cancel => self.cancel(actor, now, request.reason.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::Classification;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn new_ticket() -> Ticket {
        Ticket::create(
            "ticket-1",
            "operator",
            Classification::new("BT03").with_machine("Wave Soldering"),
            t0(),
        )
    }

    #[test]
    fn test_full_scenario_accounts_busy_hold_and_waiting() {
        let ticket = new_ticket();

        let ticket = ticket.start_doing("alice", at(10)).unwrap();
        assert_eq!(ticket.status, TicketStatus::Doing);
        assert_eq!(ticket.busy_started_at, Some(at(10)));

        let ticket = ticket
            .start_hold("alice", at(70), Some("waiting parts"))
            .unwrap();
        assert_eq!(ticket.busy_seconds, 60);
        assert!(ticket.busy_started_at.is_none());
        assert_eq!(ticket.hold_started_at, Some(at(70)));

        let ticket = ticket.start_doing("alice", at(130)).unwrap();
        assert_eq!(ticket.hold_seconds, 60);
        assert!(ticket.hold_started_at.is_none());

        let ticket = ticket.done("alice", at(190), Some("fixed")).unwrap();
        assert_eq!(ticket.busy_seconds, 120);
        assert_eq!(ticket.hold_seconds, 60);
        assert_eq!(ticket.status, TicketStatus::Done);
        assert_eq!(ticket.closed_at, Some(at(190)));
        assert_eq!(ticket.done_by.as_deref(), Some("alice"));
        assert_eq!(ticket.solution.as_deref(), Some("fixed"));
        assert!(ticket.current_actor.is_none());
        assert_eq!(ticket.last_action, Some(TicketAction::Done));

        let report = ticket.report().unwrap();
        assert_eq!(report.waiting_seconds, 10);
        assert_eq!(report.total_seconds, 190);
    }

    #[test]
    fn test_restart_doing_is_rejected_without_touching_timer() {
        let ticket = new_ticket().start_doing("alice", at(10)).unwrap();
        let err = ticket.start_doing("alice", at(50)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidStateTransition {
                action: TicketAction::Doing,
                status: TicketStatus::Doing,
            }
        );
        assert_eq!(ticket.busy_started_at, Some(at(10)));
        assert_eq!(ticket.busy_seconds, 0);
    }

    #[test]
    fn test_rehold_is_rejected() {
        let ticket = new_ticket()
            .start_hold("alice", at(5), Some("no parts"))
            .unwrap();
        let err = ticket
            .start_hold("alice", at(20), Some("still no parts"))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(ticket.hold_started_at, Some(at(5)));
    }

    #[test]
    fn test_hold_from_pending_opens_hold_interval() {
        let ticket = new_ticket()
            .start_hold("alice", at(30), Some("  line stopped  "))
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Hold);
        assert_eq!(ticket.hold_reason.as_deref(), Some("line stopped"));
        assert_eq!(ticket.busy_seconds, 0);
        assert_eq!(ticket.current_actor.as_deref(), Some("alice"));
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let doing = new_ticket().start_doing("alice", at(10)).unwrap();

        let err = doing.start_hold("alice", at(20), Some("   ")).unwrap_err();
        assert_eq!(err, TransitionError::Validation { field: "reason" });

        let err = doing.done("alice", at(20), None).unwrap_err();
        assert_eq!(err, TransitionError::Validation { field: "solution" });

        let err = doing.done("alice", at(20), Some("\t\n")).unwrap_err();
        assert_eq!(err, TransitionError::Validation { field: "solution" });

        let err = doing.cancel("alice", at(20), Some("")).unwrap_err();
        assert_eq!(err, TransitionError::Validation { field: "reason" });

        let err = new_ticket().start_doing("  ", at(20)).unwrap_err();
        assert_eq!(err, TransitionError::Validation { field: "actor" });

        assert_eq!(doing.status, TicketStatus::Doing);
        assert_eq!(doing.busy_started_at, Some(at(10)));
    }

    #[test]
    fn test_done_by_other_actor_is_rejected() {
        let doing = new_ticket().start_doing("alice", at(10)).unwrap();

        let err = doing.done("bob", at(100), Some("fixed")).unwrap_err();
        assert_eq!(
            err,
            TransitionError::OwnershipConflict {
                holder: "alice".to_string(),
                actor: "bob".to_string(),
            }
        );

        let done = doing.done("alice", at(100), Some("fixed")).unwrap();
        assert_eq!(done.status, TicketStatus::Done);
    }

    #[test]
    fn test_ownership_checked_before_text() {
        let doing = new_ticket().start_doing("alice", at(10)).unwrap();
        let err = doing.done("bob", at(100), None).unwrap_err();
        assert_eq!(err.kind(), "ownership_conflict");
    }

    #[test]
    fn test_claims_by_other_actor_are_rejected() {
        let doing = new_ticket().start_doing("alice", at(10)).unwrap();
        let err = doing.start_hold("bob", at(20), Some("parts")).unwrap_err();
        assert_eq!(err.kind(), "ownership_conflict");

        let hold = doing.start_hold("alice", at(20), Some("parts")).unwrap();
        let err = hold.start_doing("bob", at(40)).unwrap_err();
        assert_eq!(err.kind(), "ownership_conflict");

        let resumed = hold.start_doing("alice", at(40)).unwrap();
        assert_eq!(resumed.current_actor.as_deref(), Some("alice"));
    }

    #[test]
    fn test_cancel_is_open_to_any_actor() {
        let doing = new_ticket().start_doing("alice", at(10)).unwrap();
        let cancelled = doing.cancel("supervisor", at(40), Some("duplicate")).unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert_eq!(cancelled.canceled_by.as_deref(), Some("supervisor"));
        assert_eq!(cancelled.busy_seconds, 30);
        assert!(cancelled.current_actor.is_none());
    }

    #[test]
    fn test_cancel_pending_ticket() {
        let cancelled = new_ticket()
            .cancel("operator", at(45), Some("raised by mistake"))
            .unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert_eq!(cancelled.busy_seconds, 0);
        assert_eq!(cancelled.hold_seconds, 0);
        assert_eq!(cancelled.closed_at, Some(at(45)));
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("raised by mistake"));
        assert_eq!(cancelled.last_action, Some(TicketAction::Cancel));
    }

    #[test]
    fn test_cancel_flushes_open_hold() {
        let hold = new_ticket()
            .start_doing("alice", at(0))
            .unwrap()
            .start_hold("alice", at(100), Some("parts"))
            .unwrap();
        let cancelled = hold.cancel("alice", at(250), Some("machine scrapped")).unwrap();
        assert_eq!(cancelled.busy_seconds, 100);
        assert_eq!(cancelled.hold_seconds, 150);
        assert!(cancelled.hold_started_at.is_none());
    }

    #[test]
    fn test_terminal_tickets_reject_everything() {
        let done = new_ticket()
            .start_doing("alice", at(10))
            .unwrap()
            .done("alice", at(20), Some("fixed"))
            .unwrap();

        let err = done.cancel("alice", at(30), Some("oops")).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidStateTransition {
                action: TicketAction::Cancel,
                status: TicketStatus::Done,
            }
        );
        assert!(done.start_doing("alice", at(30)).is_err());
        assert!(done.start_hold("alice", at(30), Some("x")).is_err());
        assert!(done.done("alice", at(30), Some("again")).is_err());
        assert_eq!(done.closed_at, Some(at(20)));
    }

    #[test]
    fn test_done_from_pending_is_rejected() {
        let err = new_ticket().done("alice", at(10), Some("fixed")).unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut ticket = new_ticket().start_doing("alice", at(10)).unwrap();
        ticket.flush_busy(at(40));
        assert_eq!(ticket.busy_seconds, 30);
        ticket.flush_busy(at(90));
        assert_eq!(ticket.busy_seconds, 30);
        ticket.flush_hold(at(90));
        assert_eq!(ticket.hold_seconds, 0);
    }

    #[test]
    fn test_clock_stepping_backwards_never_decreases_accumulators() {
        let ticket = new_ticket().start_doing("alice", at(100)).unwrap();
        let hold = ticket.start_hold("alice", at(90), Some("parts")).unwrap();
        assert_eq!(hold.busy_seconds, 0);
        assert_eq!(ticket.open_interval_seconds(at(50)), 0);
    }

    #[test]
    fn test_backwards_clock_keeps_accounting_within_ticket_lifetime() {
        let closed = new_ticket()
            .start_doing("alice", at(10))
            .unwrap()
            .start_hold("alice", at(100), Some("parts"))
            .unwrap()
            .start_doing("alice", at(20))
            .unwrap()
            .done("alice", at(100), Some("fixed"))
            .unwrap();

        assert_eq!(closed.busy_seconds, 90);
        assert_eq!(closed.hold_seconds, 0);
        assert_eq!(closed.closed_at, Some(at(100)));

        let report = closed.report().unwrap();
        assert_eq!(report.total_seconds, 100);
        assert_eq!(report.waiting_seconds, 10);
        assert!(report.busy_seconds + report.hold_seconds <= report.total_seconds);
    }

    #[test]
    fn test_transition_instant_never_precedes_last_update() {
        let ticket = new_ticket().start_hold("alice", at(50), Some("parts")).unwrap();
        let resumed = ticket.start_doing("alice", at(30)).unwrap();
        assert_eq!(resumed.updated_at, at(50));
        assert_eq!(resumed.busy_started_at, Some(at(50)));
        assert_eq!(resumed.hold_seconds, 0);
    }

    #[test]
    fn test_sub_second_intervals_are_floored() {
        let ticket = new_ticket().start_doing("alice", at(10)).unwrap();
        let later = at(12) + Duration::milliseconds(999);
        let hold = ticket.start_hold("alice", later, Some("parts")).unwrap();
        assert_eq!(hold.busy_seconds, 2);
    }

    #[test]
    fn test_apply_dispatches_by_action() {
        let ticket = new_ticket();
        let doing = ticket
            .apply(&TransitionRequest::doing(), "alice", at(10))
            .unwrap();
        assert_eq!(doing.status, TicketStatus::Doing);

        let hold = doing
            .apply(&TransitionRequest::hold("parts"), "alice", at(20))
            .unwrap();
        assert_eq!(hold.status, TicketStatus::Hold);

        let done = hold
            .apply(&TransitionRequest::done("replaced nozzle"), "alice", at(30))
            .unwrap();
        assert_eq!(done.status, TicketStatus::Done);
        assert_eq!(done.hold_seconds, 10);
        assert_eq!(done.busy_seconds, 10);

        let err = done
            .apply(&TransitionRequest::cancel("late"), "alice", at(40))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[test]
    fn test_accounted_seconds_includes_open_interval() {
        let ticket = new_ticket()
            .start_doing("alice", at(10))
            .unwrap()
            .start_hold("alice", at(70), Some("parts"))
            .unwrap();
        assert_eq!(ticket.accounted_seconds(at(100)), 90);
    }
}
