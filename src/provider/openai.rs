//! OpenAI completion provider
//!
//! Talks to the chat completions API. Streaming uses the provider's native
//! token stream decoded by the shared SSE parser.

use super::sse::ChunkDecoder;
use super::{
    rejection_error, transport_error, ChunkStream, Completion, CompletionProvider, SYSTEM_PROMPT,
};
use crate::config::ProviderConfig;
use crate::utils::error::{Result, ServiceError};
use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    http_client: Client,
}

impl OpenAiProvider {
    /// Create a provider from configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(|e| {
                ServiceError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            http_client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &str, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
        })
    }

    async fn send(&self, body: Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection_error(status, &body));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Completion> {
        let started = Instant::now();

        let response = self.send(self.request_body(prompt, false)).await?;
        let payload: Value = response.json().await.map_err(transport_error)?;

        let text = payload
            .get("choices")
            .and_then(|choices| choices.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .unwrap_or_default()
            .to_string();

        let usage = payload.get("usage");
        let prompt_tokens = read_count(usage, "prompt_tokens");
        let completion_tokens = read_count(usage, "completion_tokens");
        let total_tokens = read_count(usage, "total_tokens");

        debug!(
            model = %self.model,
            total_tokens,
            "openai completion finished"
        );

        Ok(Completion {
            text,
            model: self.model.clone(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream> {
        let response = self.send(self.request_body(prompt, true)).await?;
        let byte_stream = Box::pin(response.bytes_stream());
        Ok(ChunkDecoder::new(byte_stream).into_chunk_stream())
    }
}

fn read_count(usage: Option<&Value>, field: &str) -> u32 {
    usage
        .and_then(|usage| usage.get(field))
        .and_then(|count| count.as_u64())
        .unwrap_or(0) as u32
}
