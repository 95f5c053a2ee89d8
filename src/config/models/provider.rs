//! Completion provider configuration

use super::env_var;
use crate::utils::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which completion provider backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions API
    #[default]
    OpenAi,
    /// Google Gemini generateContent API
    Gemini,
}

impl std::str::FromStr for ProviderKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(ServiceError::Config(format!(
                "Unknown provider kind: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider selection
    #[serde(default)]
    pub kind: ProviderKind,
    /// Provider API key
    #[serde(default)]
    pub api_key: String,
    /// Override for the provider API base URL
    pub api_base: Option<String>,
    /// Model name; the provider default is used when unset
    pub model: Option<String>,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: String::new(),
            api_base: None,
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Build provider configuration from environment variables
    ///
    /// PROVIDER selects the backend; the matching *_API_KEY, *_MODEL and
    /// *_API_BASE variables configure it.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(kind) = env_var("PROVIDER") {
            config.kind = kind.parse()?;
        }

        let (key_var, model_var, base_var) = match config.kind {
            ProviderKind::OpenAi => ("OPENAI_API_KEY", "OPENAI_MODEL", "OPENAI_API_BASE"),
            ProviderKind::Gemini => ("GEMINI_API_KEY", "GEMINI_MODEL", "GEMINI_API_BASE"),
        };

        if let Some(api_key) = env_var(key_var) {
            config.api_key = api_key;
        }
        config.model = env_var(model_var);
        config.api_base = env_var(base_var);

        if let Some(temperature) = env_var("PROVIDER_TEMPERATURE") {
            config.temperature = temperature.parse().map_err(|_| {
                ServiceError::Config(format!("Invalid PROVIDER_TEMPERATURE: {}", temperature))
            })?;
        }
        if let Some(max_tokens) = env_var("PROVIDER_MAX_TOKENS") {
            config.max_tokens = max_tokens.parse().map_err(|_| {
                ServiceError::Config(format!("Invalid PROVIDER_MAX_TOKENS: {}", max_tokens))
            })?;
        }

        Ok(config)
    }

    /// Validate provider configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.api_key.is_empty() {
            // Startup still succeeds so local development works; requests will fail upstream.
            warn!(
                provider = %self.kind,
                "Provider API key is not configured; completion requests will be rejected upstream"
            );
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }

        if self.max_tokens == 0 {
            return Err("max_tokens cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            return Err("request_timeout cannot be 0".to_string());
        }

        Ok(())
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}
