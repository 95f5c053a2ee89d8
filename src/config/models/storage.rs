//! Storage configuration

use super::env_var;
use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl StorageConfig {
    /// Build storage configuration from the DATABASE_URL environment variable
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = env_var("DATABASE_URL") {
            config.database.url = url;
        }
        config
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL (sqlite:// or postgres://)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://data/cursorconnect.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}
