//! Authentication configuration

use super::env_var;
use crate::utils::error::{Result, ServiceError};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret
    #[serde(default = "generate_secure_jwt_secret")]
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: generate_secure_jwt_secret(),
            jwt_expiration: default_jwt_expiration(),
        }
    }
}

impl AuthConfig {
    /// Build auth configuration from JWT_SECRET / JWT_EXPIRATION environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(secret) = env_var("JWT_SECRET") {
            config.jwt_secret = secret;
        }
        if let Some(expiration) = env_var("JWT_EXPIRATION") {
            config.jwt_expiration = expiration.parse().map_err(|_| {
                ServiceError::Config(format!("Invalid JWT_EXPIRATION value: {}", expiration))
            })?;
        }

        Ok(config)
    }

    /// Validate authentication configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.jwt_secret.len() < 32 {
            return Err("JWT secret must be at least 32 characters long for security".to_string());
        }

        if self.jwt_secret == "your-secret-key" || self.jwt_secret == "change-me" {
            return Err(
                "JWT secret must not use default values. Please generate a secure random secret."
                    .to_string(),
            );
        }

        if self.jwt_expiration < 300 {
            return Err("JWT expiration should be at least 5 minutes (300 seconds)".to_string());
        }

        if self.jwt_expiration > 86400 * 30 {
            return Err(
                "JWT expiration should not exceed 30 days for security reasons".to_string(),
            );
        }

        Ok(())
    }
}

/// Generate a secure random JWT secret
fn generate_secure_jwt_secret() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

fn default_jwt_expiration() -> u64 {
    86400 // 24 hours
}
