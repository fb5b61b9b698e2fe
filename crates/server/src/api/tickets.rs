//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use supporthub_core::{
    format_hms, ActionRequest, Classification, ClosedTicket, CreateTicketRequest, Ticket,
    TicketFilter, TicketReport, TicketStatus,
};
use tracing::debug;

use super::error::ApiError;
use super::{clamp_page, Page};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for raising a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    /// Operator raising the ticket
    pub requester: String,
    /// Line, machine and problem details
    #[serde(flatten)]
    pub classification: Classification,
}

/// Query parameters for the active board
#[derive(Debug, Deserialize)]
pub struct ListActiveParams {
    pub line: Option<String>,
    pub machine: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for history
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub line: Option<String>,
    pub machine: Option<String>,
    /// `YYYY-MM-DD` (start of day, UTC) or RFC 3339
    pub from: Option<String>,
    /// `YYYY-MM-DD` (end of day, UTC) or RFC 3339, inclusive
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for the active board
#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<Ticket>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Report durations rendered as `HH:MM:SS`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReportHms {
    pub waiting: String,
    pub total: String,
    pub busy: String,
    pub hold: String,
}

impl From<&TicketReport> for ReportHms {
    fn from(report: &TicketReport) -> Self {
        Self {
            waiting: format_hms(report.waiting_seconds),
            total: format_hms(report.total_seconds),
            busy: format_hms(report.busy_seconds),
            hold: format_hms(report.hold_seconds),
        }
    }
}

/// A closed ticket as shown in history
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub closed: ClosedTicket,
    /// Technician who finished or cancelled the ticket
    pub closed_by: Option<String>,
    pub report_hms: ReportHms,
}

impl From<ClosedTicket> for HistoryEntry {
    fn from(closed: ClosedTicket) -> Self {
        let report_hms = ReportHms::from(&closed.report);
        let closed_by = closed.ticket.closed_by().map(str::to_string);
        Self {
            closed,
            closed_by,
            report_hms,
        }
    }
}

/// Response for history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub tickets: Vec<HistoryEntry>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for a single ticket report
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub ticket_id: String,
    pub status: TicketStatus,
    pub report: TicketReport,
    pub report_hms: ReportHms,
}

// ============================================================================
// Handlers
// ============================================================================

/// Raise a new ticket
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTicketBody>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let ticket = state
        .tickets()
        .create(CreateTicketRequest::new(body.requester, body.classification))
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.tickets().get(&id)?))
}

/// Active board: PENDING, DOING and HOLD tickets, newest first
pub async fn list_active(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListActiveParams>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    let Page { limit, offset } = clamp_page(params.limit, params.offset);
    let filter = place_filter(TicketFilter::new(), params.line, params.machine);

    let tickets = state
        .tickets()
        .list_active(filter.clone().with_limit(limit).with_offset(offset))?;
    let total = state.tickets().count_active(filter)?;

    Ok(Json(ListTicketsResponse {
        tickets,
        total,
        limit,
        offset,
    }))
}

/// Closed tickets with their time breakdown, most recently closed first
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Page { limit, offset } = clamp_page(params.limit, params.offset);
    let from = params
        .from
        .as_deref()
        .map(|raw| parse_bound(raw, DayEdge::Start))
        .transpose()?;
    let to = params
        .to
        .as_deref()
        .map(|raw| parse_bound(raw, DayEdge::End))
        .transpose()?;
    debug!(?from, ?to, "Querying ticket history");

    let filter = place_filter(TicketFilter::new(), params.line, params.machine)
        .with_created_range(from, to);

    let tickets = state
        .tickets()
        .history(filter.clone().with_limit(limit).with_offset(offset))?;
    let total = state.tickets().count_history(filter)?;

    Ok(Json(HistoryResponse {
        tickets: tickets.into_iter().map(HistoryEntry::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Time breakdown of a closed ticket
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let ticket = state.tickets().get(&id)?;
    let report = ticket.report().ok_or_else(|| {
        ApiError::new(
            StatusCode::CONFLICT,
            format!("Ticket is still open: {}", ticket.status),
        )
    })?;

    Ok(Json(ReportResponse {
        ticket_id: ticket.id,
        status: ticket.status,
        report_hms: ReportHms::from(&report),
        report,
    }))
}

/// Apply a technician action (`doing`, `hold`, `done`, `cancel`)
pub async fn perform_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.tickets().perform(&id, body).await?))
}

// ============================================================================
// Helpers
// ============================================================================

fn place_filter(
    mut filter: TicketFilter,
    line: Option<String>,
    machine: Option<String>,
) -> TicketFilter {
    if let Some(line) = non_blank(line) {
        filter = filter.with_line(line);
    }
    if let Some(machine) = non_blank(machine) {
        filter = filter.with_machine(machine);
    }
    filter
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy)]
enum DayEdge {
    Start,
    End,
}

/// Parse a history bound; bare dates cover the whole UTC day.
fn parse_bound(raw: &str, edge: DayEdge) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(format!(
            "Invalid date: {} (expected YYYY-MM-DD or RFC 3339)",
            raw
        ))
    })?;
    let time = match edge {
        DayEdge::Start => NaiveTime::MIN,
        DayEdge::End => NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}
