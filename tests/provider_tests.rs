//! Provider client integration tests
//!
//! Uses wiremock to stand in for the provider HTTP APIs, covering
//! completions, error mapping and the streaming paths.

use cursorconnect::config::ProviderConfig;
use cursorconnect::provider::{
    CompletionProvider, GeminiProvider, OpenAiProvider, ProviderChunk,
};
use cursorconnect::ServiceError;
use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        api_key: "test-key".to_string(),
        api_base: Some(server.uri()),
        ..Default::default()
    }
}

fn gemini_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        kind: cursorconnect::config::ProviderKind::Gemini,
        api_key: "test-key".to_string(),
        api_base: Some(server.uri()),
        ..Default::default()
    }
}

async fn drain(mut stream: cursorconnect::provider::ChunkStream) -> Vec<ProviderChunk> {
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk);
    }
    chunks
}

#[tokio::test]
async fn openai_complete_parses_text_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "The answer is 4." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 6, "total_tokens": 18 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&openai_config(&server)).unwrap();
    let completion = provider.complete("2+2?").await.unwrap();

    assert_eq!(completion.text, "The answer is 4.");
    assert!(!completion.text.is_empty());
    assert_eq!(completion.prompt_tokens, 12);
    assert_eq!(completion.completion_tokens, 6);
    assert_eq!(completion.total_tokens, 18);
}

#[tokio::test]
async fn openai_4xx_maps_to_provider_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&openai_config(&server)).unwrap();
    let err = provider.complete("2+2?").await.unwrap_err();

    match err {
        ServiceError::ProviderRejected { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("expected ProviderRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn openai_5xx_maps_to_provider_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&openai_config(&server)).unwrap();
    let err = provider.complete("2+2?").await.unwrap_err();

    assert!(matches!(err, ServiceError::ProviderUnavailable(_)));
}

#[tokio::test]
async fn openai_connection_refused_maps_to_provider_unavailable() {
    // Nothing is listening on this port
    let provider = OpenAiProvider::new(&ProviderConfig {
        api_key: "test-key".to_string(),
        api_base: Some("http://127.0.0.1:9".to_string()),
        connect_timeout: 1,
        request_timeout: 2,
        ..Default::default()
    })
    .unwrap();

    let err = provider.complete("2+2?").await.unwrap_err();
    assert!(matches!(err, ServiceError::ProviderUnavailable(_)));
}

#[tokio::test]
async fn openai_stream_decodes_chunks_in_order() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"The \"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"answer is \"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"4.\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&openai_config(&server)).unwrap();
    let stream = provider.stream("2+2?").await.unwrap();
    let chunks = drain(stream).await;

    assert_eq!(
        chunks,
        vec![
            ProviderChunk::Text("The ".to_string()),
            ProviderChunk::Text("answer is ".to_string()),
            ProviderChunk::Text("4.".to_string()),
            ProviderChunk::Done,
        ]
    );
}

#[tokio::test]
async fn openai_stream_open_failure_is_a_plain_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached" }
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&openai_config(&server)).unwrap();
    let err = provider.stream("2+2?").await.err().unwrap();

    assert!(matches!(
        err,
        ServiceError::ProviderRejected { status: 429, .. }
    ));
}

#[tokio::test]
async fn gemini_complete_joins_parts_and_estimates_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "The answer " },
                        { "text": "is 4." }
                    ]
                },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(&gemini_config(&server)).unwrap();
    let completion = provider.complete("2+2?").await.unwrap();

    assert_eq!(completion.text, "The answer is 4.");
    assert_eq!(completion.model, "gemini-2.0-flash");
    // Character-count heuristic: ceil(len / 4)
    assert_eq!(completion.prompt_tokens, 1); // "2+2?" is 4 chars
    assert_eq!(completion.completion_tokens, 4); // 16 chars
    assert_eq!(completion.total_tokens, 5);
}

#[tokio::test]
async fn gemini_stream_synthesizes_chunks_that_reassemble() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "First sentence here. Second one follows." }]
                }
            }]
        })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(&gemini_config(&server)).unwrap();
    let stream = provider.stream("tell me things").await.unwrap();
    let chunks = drain(stream).await;

    assert_eq!(chunks.last(), Some(&ProviderChunk::Done));
    assert_eq!(
        chunks
            .iter()
            .filter(|chunk| matches!(chunk, ProviderChunk::Done))
            .count(),
        1
    );

    let texts: Vec<&str> = chunks
        .iter()
        .filter_map(|chunk| match chunk {
            ProviderChunk::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(texts.len() > 1);
    assert_eq!(texts.join(" "), "First sentence here. Second one follows.");
}

#[tokio::test]
async fn gemini_rejection_maps_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid" }
        })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(&gemini_config(&server)).unwrap();
    let err = provider.complete("2+2?").await.unwrap_err();

    match err {
        ServiceError::ProviderRejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected ProviderRejected, got {:?}", other),
    }
}
