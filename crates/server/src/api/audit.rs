use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use supporthub_core::{AuditFilter, AuditRecord};

use super::error::ApiError;
use super::{clamp_page, Page};
use crate::state::AppState;

/// Query parameters for audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub ticket_id: Option<String>,
    /// e.g. `ticket_transitioned`
    pub event_type: Option<String>,
    /// Requester or acting technician
    pub user_id: Option<String>,
    /// Events at or after this timestamp (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Events at or before this timestamp (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for audit query endpoint
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query audit events, newest first
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, ApiError> {
    let Page { limit, offset } = clamp_page(params.limit, params.offset);

    let mut base_filter = AuditFilter::new();
    if let Some(ticket_id) = params.ticket_id {
        base_filter = base_filter.with_ticket_id(ticket_id);
    }
    if let Some(event_type) = params.event_type {
        base_filter = base_filter.with_event_type(event_type);
    }
    if let Some(user_id) = params.user_id {
        base_filter = base_filter.with_user_id(user_id);
    }
    if params.from.is_some() || params.to.is_some() {
        base_filter = base_filter.with_time_range(params.from, params.to);
    }

    let events = state
        .audit_store()
        .query(&base_filter.clone().with_limit(limit).with_offset(offset))?;
    let total = state.audit_store().count(&base_filter)?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
