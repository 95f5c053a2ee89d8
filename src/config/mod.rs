//! Configuration management for the service
//!
//! Configuration is read from a YAML file when one is present, otherwise
//! from environment variables the way the original deployment expects
//! (PORT, DATABASE_URL, JWT_SECRET, provider API keys).

pub mod models;

pub use models::*;

use crate::utils::error::{Result, ServiceError};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the service
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Completion provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServiceError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ServiceError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Self {
            server: ServerConfig::from_env()?,
            storage: StorageConfig::from_env(),
            auth: AuthConfig::from_env()?,
            provider: ProviderConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.server
            .validate()
            .map_err(|e| ServiceError::Config(format!("Server config error: {}", e)))?;

        self.auth
            .validate()
            .map_err(|e| ServiceError::Config(format!("Auth config error: {}", e)))?;

        self.provider
            .validate()
            .map_err(|e| ServiceError::Config(format!("Provider config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }
}
