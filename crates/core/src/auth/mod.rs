//! Verification of the technician performing a ticket action.

mod none;
mod password;
mod traits;

pub use none::*;
pub use password::*;
pub use traits::*;

use crate::config::{AuthConfig, AuthMethod};

/// Factory function to create an authorizer from config
pub fn create_authorizer(config: &AuthConfig) -> Result<Box<dyn ActorAuthorizer>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthorizer::new())),
        AuthMethod::Password => {
            if config.users.is_empty() {
                return Err(AuthError::ConfigurationError(
                    "auth.users must be set when using password auth method".to_string(),
                ));
            }
            Ok(Box::new(PasswordAuthorizer::new(&config.users)))
        }
    }
}
