use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{audit, handlers, middleware::metrics_middleware, tickets};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Tickets
        .route(
            "/tickets",
            get(tickets::list_active).post(tickets::create_ticket),
        )
        .route("/tickets/history", get(tickets::history))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}/report", get(tickets::get_report))
        .route("/tickets/{id}/action", post(tickets::perform_action))
        // Board polling
        .route("/active/version", get(handlers::active_version))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
