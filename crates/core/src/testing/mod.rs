//! Testing utilities shared by unit and integration tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use supporthub_core::testing::{fixtures, ManualClock};
//!
//! let clock = Arc::new(ManualClock::default());
//! let service = TicketService::new(store, authorizer, clock.clone());
//!
//! let ticket = service.create(fixtures::create_request("BT03")).await?;
//! clock.advance(chrono::Duration::minutes(5));
//! ```

mod manual_clock;

pub use manual_clock::ManualClock;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::config::UserCredential;
    use crate::ticket::{Classification, CreateTicketRequest};

    /// Fixed starting instant used by [`super::ManualClock::default`].
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// A create request for a wave-soldering fault on `line`.
    pub fn create_request(line: &str) -> CreateTicketRequest {
        CreateTicketRequest::new(
            "operator",
            Classification::new(line)
                .with_machine("Wave Soldering")
                .with_machine_type("SMT")
                .with_problem("Nozzle clogged"),
        )
    }

    /// A plaintext credential entry.
    pub fn user(username: &str, password: &str) -> UserCredential {
        UserCredential {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}
