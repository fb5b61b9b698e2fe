use std::sync::Arc;

use supporthub_core::{AuditStore, Config, SanitizedConfig, TicketService};

/// Shared application state
pub struct AppState {
    config: Config,
    tickets: Arc<TicketService>,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        tickets: Arc<TicketService>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            tickets,
            audit_store,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn tickets(&self) -> &TicketService {
        self.tickets.as_ref()
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }
}
