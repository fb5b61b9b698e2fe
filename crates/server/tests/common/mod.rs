//! In-process test fixture for the HTTP API.
//!
//! Builds the real router over in-memory SQLite stores, a password
//! authorizer and a [`ManualClock`], so tests can drive tickets through
//! their lifecycle with exact timings.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use supporthub_core::config::{DatabaseConfig, ServerConfig};
use supporthub_core::testing::ManualClock;
use supporthub_core::{
    create_audit_system, sha256_hex, AuditFilter, AuditStore, AuthConfig, AuthMethod, Config,
    PasswordAuthorizer, SqliteAuditStore, SqliteTicketStore, TicketService, UserCredential,
};
use supporthub_server::{api::create_router, state::AppState};

pub use supporthub_core::testing::fixtures;

/// Password for `alice`, stored as a SHA-256 digest.
pub const ALICE_PASSWORD: &str = "alice-pw";
/// Password for `bob`, stored in plaintext.
pub const BOB_PASSWORD: &str = "bob-pw";

pub struct TestFixture {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub tickets: Arc<TicketService>,
    pub audit_store: Arc<dyn AuditStore>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub raw: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        let users = vec![
            UserCredential {
                username: "alice".to_string(),
                password: sha256_hex(ALICE_PASSWORD),
            },
            fixtures::user("bob", BOB_PASSWORD),
        ];

        let config = Config {
            auth: AuthConfig {
                method: AuthMethod::Password,
                users: users.clone(),
            },
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 8080,
            },
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
            },
        };

        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::in_memory().expect("Failed to create audit store"));
        let ticket_store =
            Arc::new(SqliteTicketStore::in_memory().expect("Failed to create ticket store"));

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let clock = Arc::new(ManualClock::default());
        let tickets = Arc::new(
            TicketService::new(
                ticket_store,
                Arc::new(PasswordAuthorizer::new(&users)),
                clock.clone(),
            )
            .with_audit(audit_handle),
        );

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&tickets),
            Arc::clone(&audit_store),
        ));

        Self {
            router: create_router(state),
            clock,
            tickets,
            audit_store,
        }
    }

    /// Move the fixture clock forward.
    pub fn advance(&self, seconds: i64) {
        self.clock.advance(chrono::Duration::seconds(seconds));
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Raise a ticket on `line` and return its ID.
    pub async fn create_ticket(&self, line: &str) -> String {
        let response = self
            .post(
                "/api/v1/tickets",
                json!({
                    "requester": "operator-7",
                    "line": line,
                    "machine": "Wave Soldering",
                    "problem": "Nozzle clogged"
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.raw);
        response.body["id"]
            .as_str()
            .expect("ticket id")
            .to_string()
    }

    /// POST an action for ticket `id`.
    pub async fn act(&self, id: &str, body: Value) -> TestResponse {
        self.post(&format!("/api/v1/tickets/{}/action", id), body)
            .await
    }

    /// Wait until the audit writer has stored at least `count` matching events.
    pub async fn wait_for_audit(&self, filter: &AuditFilter, count: i64) -> bool {
        for _ in 0..100 {
            if self.audit_store.count(filter).unwrap_or(0) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let response = self
            .router
            .clone()
            .oneshot(request_builder.body(body).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let raw = String::from_utf8_lossy(&body_bytes).into_owned();
        let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body, raw }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.raw
        );
    };
}
