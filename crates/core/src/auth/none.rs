use async_trait::async_trait;

use super::{ActorAuthorizer, AuthError};

/// Authorizer that accepts every actor.
/// Must be explicitly configured - the system won't default to this
#[derive(Debug, Default)]
pub struct NoneAuthorizer;

impl NoneAuthorizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActorAuthorizer for NoneAuthorizer {
    async fn verify(&self, _actor: &str, _credential: &str) -> Result<(), AuthError> {
        Ok(())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
