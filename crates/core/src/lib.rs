pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod testing;
pub mod ticket;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, AuditWriter, SqliteAuditStore,
};
pub use auth::{
    create_authorizer, sha256_hex, ActorAuthorizer, AuthError, NoneAuthorizer, PasswordAuthorizer,
};
pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, SanitizedConfig, UserCredential,
};
pub use ticket::{
    format_hms, ActionRequest, Classification, ClosedTicket, CreateTicketRequest,
    SqliteTicketStore, Ticket, TicketAction, TicketError, TicketFilter, TicketOrder, TicketReport,
    TicketService, TicketStatus, TicketStore, TransitionError, TransitionRequest,
};
