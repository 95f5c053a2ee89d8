//! Completion provider clients
//!
//! One [`CompletionProvider`] capability interface with two implementations
//! selected by configuration. Both share the SSE chunk parser in [`sse`]
//! instead of carrying their own copy of the decoding logic.

pub mod gemini;
pub mod openai;
pub mod sse;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::config::{ProviderConfig, ProviderKind};
use crate::utils::error::Result;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

/// System prompt sent ahead of every user query
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A parsed unit of an upstream completion stream
///
/// A [`ChunkStream`] yields zero or more `Text` chunks followed by exactly
/// one terminal chunk (`Done` or `Error`), then ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderChunk {
    /// Incremental completion text
    Text(String),
    /// End-of-stream sentinel
    Done,
    /// The upstream transport or provider failed; carries the raw detail
    Error(String),
}

impl ProviderChunk {
    /// Whether this chunk terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// A cancellable, finite, non-restartable sequence of provider chunks
///
/// Dropping the stream cancels the underlying provider request.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ProviderChunk> + Send>>;

/// A complete (non-streamed) provider response
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Model that produced the completion
    pub model: String,
    /// Prompt token count (provider-reported or estimated)
    pub prompt_tokens: u32,
    /// Completion token count (provider-reported or estimated)
    pub completion_tokens: u32,
    /// Total token count
    pub total_tokens: u32,
    /// End-to-end request latency in milliseconds
    pub latency_ms: u64,
}

/// Metadata recorded alongside a persisted interaction
///
/// Token counts are approximate where the provider does not report them;
/// they are a non-authoritative metric, not ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Model name
    pub model: String,
    /// Total token estimate
    pub tokens: u32,
    /// Prompt token count, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    /// Completion token count, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    /// Wall-clock processing time in milliseconds
    pub processing_ms: u64,
}

impl From<&Completion> for QueryMetadata {
    fn from(completion: &Completion) -> Self {
        Self {
            model: completion.model.clone(),
            tokens: completion.total_tokens,
            prompt_tokens: Some(completion.prompt_tokens),
            completion_tokens: Some(completion.completion_tokens),
            processing_ms: completion.latency_ms,
        }
    }
}

/// Capability interface for LLM completion providers
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Model the provider is configured to use
    fn model(&self) -> &str;

    /// Generate a complete response for the prompt
    ///
    /// Fails with `ProviderUnavailable` on network errors or timeouts and
    /// `ProviderRejected` on provider 4xx responses; never retried here.
    async fn complete(&self, prompt: &str) -> Result<Completion>;

    /// Open a streaming response for the prompt
    ///
    /// The caller must drain the returned stream or drop it to cancel.
    async fn stream(&self, prompt: &str) -> Result<ChunkStream>;
}

/// Construct the provider selected by configuration
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(config)?)),
        ProviderKind::Gemini => Ok(Arc::new(GeminiProvider::new(config)?)),
    }
}

/// Rough token estimate for streamed responses where the provider reports
/// no usage counters (word count scaled by a constant factor)
pub fn estimate_tokens(text: &str) -> u32 {
    (text.split_whitespace().count() as f64 * 1.3).ceil() as u32
}

/// Map a transport-level failure to the service error taxonomy
pub(crate) fn transport_error(e: reqwest::Error) -> crate::utils::error::ServiceError {
    use crate::utils::error::ServiceError;
    if e.is_timeout() {
        ServiceError::ProviderUnavailable(format!("Request timed out: {}", e))
    } else {
        ServiceError::ProviderUnavailable(format!("Network error: {}", e))
    }
}

/// Map a non-success provider response to the service error taxonomy
///
/// Only the provider's own `error.message` field is surfaced; raw payloads
/// are never forwarded to clients.
pub(crate) fn rejection_error(
    status: reqwest::StatusCode,
    body: &str,
) -> crate::utils::error::ServiceError {
    use crate::utils::error::ServiceError;

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(|message| message.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "The completion provider rejected the request".to_string());

    if status.is_client_error() {
        ServiceError::ProviderRejected {
            status: status.as_u16(),
            message,
        }
    } else {
        ServiceError::ProviderUnavailable(message)
    }
}
