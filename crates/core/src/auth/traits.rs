use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    #[error("Invalid credentials for {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Verifies the technician named on a ticket action.
///
/// There are no sessions: every action carries the actor's credential and is
/// checked on its own.
#[async_trait]
pub trait ActorAuthorizer: Send + Sync {
    /// Accept or reject `actor` presenting `credential`.
    async fn verify(&self, actor: &str, credential: &str) -> Result<(), AuthError>;

    /// Name of this authorization method
    fn method_name(&self) -> &'static str;
}
