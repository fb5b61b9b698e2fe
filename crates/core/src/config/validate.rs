use std::collections::HashSet;

use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Password auth has at least one user
/// - Usernames are non-blank and unique
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::Password && config.auth.users.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.users must not be empty when auth.method is \"password\"".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for user in &config.auth.users {
        let name = user.username.trim();
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.users entries need a non-blank username".to_string(),
            ));
        }
        if !seen.insert(name) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate username in auth.users: {}",
                name
            )));
        }
    }

    Ok(())
}
