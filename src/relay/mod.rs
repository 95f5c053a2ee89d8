//! Stream relay: bridges one provider chunk stream to one client connection
//!
//! The relay re-serializes decoded provider chunks into the service's own
//! SSE framing, accumulates the full text, and hands the accumulated text
//! to persistence when the stream terminates cleanly. Each request gets
//! its own relay instance; the database is the only resource shared
//! between sessions.

use crate::provider::{estimate_tokens, ChunkStream, ProviderChunk, QueryMetadata};
use crate::storage::{Database, NewInteraction};
use crate::utils::error::Result;
use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{web, HttpResponse};
use futures::{Stream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};
use uuid::Uuid;

/// Generic message sent downstream when the upstream provider fails;
/// upstream error detail stays in the server logs.
const UPSTREAM_ERROR_MESSAGE: &str = "An error occurred while generating the response";

/// A single downstream SSE frame
#[derive(Debug, Clone)]
pub struct Event {
    data: String,
}

impl Event {
    /// Frame carrying incremental completion text
    pub fn content(text: &str) -> Self {
        Self {
            data: json!({ "content": text }).to_string(),
        }
    }

    /// Frame carrying a client-safe error message
    pub fn error(message: &str) -> Self {
        Self {
            data: json!({ "error": message }).to_string(),
        }
    }

    /// Terminal sentinel frame
    pub fn done() -> Self {
        Self {
            data: "[DONE]".to_string(),
        }
    }

    /// Serialize the frame for transmission
    pub fn to_bytes(&self) -> web::Bytes {
        web::Bytes::from(format!("data: {}\n\n", self.data))
    }
}

/// Build the SSE response around a frame stream
///
/// Sets the event-stream content type, disables caching and proxy
/// buffering, and keeps the connection alive.
pub fn sse_response<S>(stream: S) -> HttpResponse
where
    S: Stream<Item = Result<web::Bytes>> + 'static,
{
    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(stream)
}

/// One relay session: upstream provider stream in, SSE frames out
pub struct StreamRelay {
    user_id: Option<Uuid>,
    query: String,
    model: String,
    accumulated: String,
    started: Instant,
}

impl StreamRelay {
    /// Create a relay for one request
    ///
    /// Anonymous sessions (no user id) are relayed but never persisted.
    pub fn new(user_id: Option<Uuid>, query: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            user_id,
            query: query.into(),
            model: model.into(),
            accumulated: String::new(),
            started: Instant::now(),
        }
    }

    /// Drive the upstream stream and return the downstream frame stream
    ///
    /// The upstream is consumed on a spawned task feeding a channel; when
    /// the client disconnects the channel closes, the task stops, and
    /// dropping the upstream stream cancels the provider request.
    pub fn into_sse_stream(
        self,
        upstream: ChunkStream,
        database: Arc<Database>,
    ) -> impl Stream<Item = Result<web::Bytes>> + Unpin {
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            self.pump(upstream, database, tx).await;
        });

        ReceiverStream::new(rx)
    }

    async fn pump(
        mut self,
        mut upstream: ChunkStream,
        database: Arc<Database>,
        tx: mpsc::Sender<Result<web::Bytes>>,
    ) {
        while let Some(chunk) = upstream.next().await {
            match chunk {
                ProviderChunk::Text(text) => {
                    self.accumulated.push_str(&text);
                    // Frames go out immediately and in arrival order
                    if tx.send(Ok(Event::content(&text).to_bytes())).await.is_err() {
                        debug!("client disconnected, cancelling upstream stream");
                        return;
                    }
                }
                ProviderChunk::Done => {
                    self.finish(database, &tx).await;
                    return;
                }
                ProviderChunk::Error(detail) => {
                    error!(error = %detail, "upstream provider stream failed");
                    let frame = Event::error(UPSTREAM_ERROR_MESSAGE).to_bytes();
                    let _ = tx.send(Ok(frame)).await;
                    // Partial accumulation is discarded: only fully
                    // terminated streams are recorded.
                    return;
                }
            }
        }

        // Upstream ended without a terminal chunk; treat as completed
        self.finish(database, &tx).await;
    }

    async fn finish(self, database: Arc<Database>, tx: &mpsc::Sender<Result<web::Bytes>>) {
        if tx.send(Ok(Event::done().to_bytes())).await.is_err() {
            debug!("client disconnected before end of stream");
            return;
        }

        let Some(user_id) = self.user_id else {
            return;
        };
        if self.accumulated.is_empty() {
            return;
        }

        let metadata = QueryMetadata {
            model: self.model,
            tokens: estimate_tokens(&self.accumulated),
            prompt_tokens: None,
            completion_tokens: None,
            processing_ms: self.started.elapsed().as_millis() as u64,
        };

        let record = NewInteraction {
            user_id,
            query_text: self.query,
            response_text: self.accumulated,
            metadata,
        };

        // Fire-and-forget relative to the downstream connection, which has
        // already been told the stream ended.
        tokio::spawn(async move {
            if let Err(e) = database.insert_interaction(record).await {
                error!(error = %e, "failed to record completed interaction");
            }
        });
    }
}
