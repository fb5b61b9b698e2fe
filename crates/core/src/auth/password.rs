//! Per-action password verification for technicians.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{ActorAuthorizer, AuthError};
use crate::config::UserCredential;

/// Authorizer backed by the `auth.users` table from config.
///
/// A stored password that is exactly 64 hex characters is treated as a
/// SHA-256 digest of the real password; anything else is legacy plaintext.
/// Both sides are trimmed before comparison.
pub struct PasswordAuthorizer {
    users: HashMap<String, String>,
}

impl PasswordAuthorizer {
    pub fn new(users: &[UserCredential]) -> Self {
        let users = users
            .iter()
            .map(|u| (u.username.trim().to_string(), u.password.trim().to_string()))
            .collect();
        Self { users }
    }
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn password_matches(credential: &str, stored: &str) -> bool {
    let credential = credential.trim();
    if is_sha256_hex(stored) {
        constant_time_eq(
            sha256_hex(credential).as_bytes(),
            stored.to_ascii_lowercase().as_bytes(),
        )
    } else {
        constant_time_eq(credential.as_bytes(), stored.as_bytes())
    }
}

#[async_trait]
impl ActorAuthorizer for PasswordAuthorizer {
    async fn verify(&self, actor: &str, credential: &str) -> Result<(), AuthError> {
        let actor = actor.trim();
        let stored = self
            .users
            .get(actor)
            .ok_or_else(|| AuthError::UnknownActor(actor.to_string()))?;

        if password_matches(credential, stored) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials(actor.to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "password"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
