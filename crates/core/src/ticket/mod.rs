//! Maintenance tickets: data model, lifecycle engine, storage and service.

mod lifecycle;
mod report;
mod service;
mod sqlite_store;
mod store;
mod types;

pub use lifecycle::{TransitionError, TransitionRequest};
pub use report::{format_hms, TicketReport};
pub use service::{ActionRequest, ClosedTicket, TicketService};
pub use sqlite_store::SqliteTicketStore;
pub use store::{
    CreateTicketRequest, TicketError, TicketFilter, TicketOrder, TicketStore, TransitionFn,
};
pub use types::{
    Classification, Ticket, TicketAction, TicketStatus, UnknownAction, UnknownStatus,
};
