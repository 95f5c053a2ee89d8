//! Gemini completion provider
//!
//! The generateContent API returns whole responses, so streaming is
//! synthesized: the full text is fetched and re-emitted in small
//! sentence-or-word-bounded chunks with a short delay between them. This
//! keeps the streaming contract uniform for callers; it is a compatibility
//! shim, not a performance optimization.

use super::{
    rejection_error, transport_error, ChunkStream, Completion, CompletionProvider, ProviderChunk,
};
use crate::config::ProviderConfig;
use crate::utils::error::{Result, ServiceError};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Delay between synthesized stream chunks
const CHUNK_DELAY: Duration = Duration::from_millis(40);

/// Target size of word-bounded synthesized chunks, in characters
const CHUNK_TARGET_LEN: usize = 30;

static SENTENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("invalid sentence regex"));

/// Gemini generateContent client
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    http_client: Client,
}

impl GeminiProvider {
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

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }

    async fn fetch(&self, prompt: &str) -> Result<Value> {
        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            }
        });

        let response = self
            .http_client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection_error(status, &body));
        }

        response.json().await.map_err(transport_error)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Completion> {
        let started = Instant::now();

        let payload = self.fetch(prompt).await?;
        let text = extract_candidate_text(&payload);

        // Gemini reports no usage counters here; approximate at four
        // characters per token. Non-authoritative.
        let prompt_tokens = (prompt.len() as f64 / 4.0).ceil() as u32;
        let completion_tokens = (text.len() as f64 / 4.0).ceil() as u32;

        debug!(model = %self.model, completion_chars = text.len(), "gemini completion finished");

        Ok(Completion {
            text,
            model: self.model.clone(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream> {
        // Fetch the whole response up front; the stream only re-chunks it.
        let completion = self.complete(prompt).await?;
        Ok(synthesized_stream(completion.text))
    }
}

/// Join the text parts of the first candidate
fn extract_candidate_text(payload: &Value) -> String {
    payload
        .get("candidates")
        .and_then(|candidates| candidates.as_array())
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|text| text.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Re-emit a full response as a chunk stream with inter-chunk delays
fn synthesized_stream(text: String) -> ChunkStream {
    Box::pin(async_stream::stream! {
        let chunks = split_into_chunks(&text);
        let last = chunks.len().saturating_sub(1);
        for (index, chunk) in chunks.into_iter().enumerate() {
            yield ProviderChunk::Text(chunk);
            if index < last {
                tokio::time::sleep(CHUNK_DELAY).await;
            }
        }
        yield ProviderChunk::Done;
    })
}

/// Split a full response into sentence-bounded chunks, falling back to
/// word groups of roughly [`CHUNK_TARGET_LEN`] characters
fn split_into_chunks(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    if text.len() < 20 {
        return vec![text.to_string()];
    }

    let sentences: Vec<String> = SENTENCE_REGEX
        .find_iter(text)
        .map(|sentence| sentence.as_str().trim().to_string())
        .filter(|sentence| !sentence.is_empty())
        .collect();

    if !sentences.is_empty() {
        return sentences;
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        current.push_str(word);
        current.push(' ');
        if current.len() > CHUNK_TARGET_LEN {
            chunks.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_extract_candidate_text() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "The answer " },
                        { "text": "is 4." }
                    ]
                },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(extract_candidate_text(&payload), "The answer is 4.");
    }

    #[test]
    fn test_extract_candidate_text_empty_payload() {
        assert_eq!(extract_candidate_text(&json!({})), "");
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split_into_chunks("short"), vec!["short".to_string()]);
    }

    #[test]
    fn test_sentence_chunks() {
        let chunks = split_into_chunks("First sentence here. Second one follows! Third asks?");
        assert_eq!(
            chunks,
            vec![
                "First sentence here.".to_string(),
                "Second one follows!".to_string(),
                "Third asks?".to_string(),
            ]
        );
    }

    #[test]
    fn test_word_fallback_chunks() {
        let text = "just a stream of words with no terminal punctuation at all in it";
        let chunks = split_into_chunks(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= CHUNK_TARGET_LEN + 20, "chunk too long: {}", chunk);
        }

        // Everything concatenates back to the original words
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(split_into_chunks("").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesized_stream_terminates_with_done() {
        let mut stream = synthesized_stream("Chunk one. Chunk two.".to_string());

        let mut texts = Vec::new();
        loop {
            match stream.next().await.expect("stream ended early") {
                ProviderChunk::Text(text) => texts.push(text),
                ProviderChunk::Done => break,
                ProviderChunk::Error(e) => panic!("unexpected error chunk: {}", e),
            }
        }

        assert_eq!(texts, vec!["Chunk one.".to_string(), "Chunk two.".to_string()]);
        assert!(stream.next().await.is_none());
    }
}
