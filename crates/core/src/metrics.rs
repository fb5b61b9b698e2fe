//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket intake
//! - Lifecycle transitions and rejections
//! - Time breakdown of closed tickets

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

use crate::ticket::{Ticket, TicketReport};

// =============================================================================
// Intake
// =============================================================================

/// Tickets raised.
pub static TICKETS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("supporthub_tickets_created_total", "Total tickets raised")
        .expect("valid metric definition")
});

// =============================================================================
// Lifecycle
// =============================================================================

/// Applied transitions by action and resulting status.
pub static TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "supporthub_transitions_total",
            "Total ticket transitions applied",
        ),
        &["action", "to_status"],
    )
    .expect("valid metric definition")
});

/// Refused transitions by action and reason.
pub static TRANSITION_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "supporthub_transition_rejections_total",
            "Total ticket transitions refused",
        ),
        &["action", "kind"], // kind: "invalid_state", "ownership_conflict", "validation", "unauthorized"
    )
    .expect("valid metric definition")
});

/// Busy, hold and waiting time of closed tickets.
pub static CLOSED_TICKET_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "supporthub_closed_ticket_seconds",
            "Time breakdown of closed tickets",
        )
        .buckets(vec![
            60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 14400.0, 28800.0, 86400.0,
        ]),
        &["status", "component"], // component: "busy", "hold", "waiting"
    )
    .expect("valid metric definition")
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record the time breakdown of a ticket that just closed.
pub fn observe_closed(ticket: &Ticket, report: &TicketReport) {
    let status = ticket.status.as_str();
    for (component, seconds) in [
        ("busy", report.busy_seconds),
        ("hold", report.hold_seconds),
        ("waiting", report.waiting_seconds),
    ] {
        CLOSED_TICKET_SECONDS
            .with_label_values(&[status, component])
            .observe(seconds as f64);
    }
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TICKETS_CREATED.clone()),
        Box::new(TRANSITIONS.clone()),
        Box::new(TRANSITION_REJECTIONS.clone()),
        Box::new(CLOSED_TICKET_SECONDS.clone()),
    ]
}
