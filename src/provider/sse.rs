//! SSE chunk parsing for provider streams
//!
//! A single parser shared by every provider: splits raw transport buffers
//! into `data:` lines, recognizes the end-of-stream sentinel and extracts
//! incremental text from the known frame shapes.

use super::{ChunkStream, ProviderChunk};
use bytes::Bytes;
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Check if an SSE line indicates end of stream
pub fn is_done_line(line: &str) -> bool {
    let line = line.trim();
    let payload = line.strip_prefix(DATA_PREFIX).map(str::trim).unwrap_or(line);
    payload == DONE_SENTINEL
}

/// Extract incremental completion text from a decoded frame payload
///
/// Handles the nested chat-delta shape (`choices[0].delta.content`) and the
/// flat `content` shape used by the synthesized-streaming path. Returns
/// `None` when the payload is not JSON or carries no text, in which case
/// the caller skips the line.
pub fn extract_text(data: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;

    if let Some(content) = value
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
    {
        return Some(content.to_string());
    }

    value
        .get("content")
        .and_then(|content| content.as_str())
        .map(|content| content.to_string())
}

/// Stateful SSE parser over raw transport buffers
///
/// Buffers are split on newlines; a trailing incomplete line is preserved
/// and prefixed to the next buffer, so no data is lost at read boundaries.
/// Nothing is parsed after the end-of-stream sentinel.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    done: bool,
}

impl SseParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw buffer into zero or more provider chunks
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Vec<ProviderChunk> {
        let mut chunks = Vec::new();

        if self.done {
            return chunks;
        }

        self.buffer.extend_from_slice(bytes);

        // Only complete lines are decoded; the remainder stays buffered so
        // multi-byte characters split across reads survive intact.
        let Some(pos) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return chunks;
        };
        let complete: Vec<u8> = self.buffer.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&complete);

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if is_done_line(line) {
                chunks.push(ProviderChunk::Done);
                self.done = true;
                break;
            }

            // Only data fields carry completion text; comments, event names
            // and other SSE fields are ignored.
            let Some(data) = line.strip_prefix(DATA_PREFIX).map(str::trim_start) else {
                continue;
            };

            match extract_text(data) {
                Some(content) if !content.is_empty() => {
                    chunks.push(ProviderChunk::Text(content));
                }
                Some(_) => {}
                None => {
                    // Malformed upstream frames must not abort the stream
                    debug!(frame = %data, "skipping stream frame without extractable text");
                }
            }
        }

        chunks
    }

    /// Whether the end-of-stream sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Adapts a raw transport byte stream into a [`ChunkStream`]
///
/// Transport errors become an in-band `Error` terminal chunk; a transport
/// close without the sentinel is treated as a completed stream.
pub struct ChunkDecoder<S> {
    inner: S,
    parser: SseParser,
    pending: VecDeque<ProviderChunk>,
    terminated: bool,
}

impl<S> ChunkDecoder<S>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    /// Wrap a transport byte stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            pending: VecDeque::new(),
            terminated: false,
        }
    }

    /// Box the decoder into the shared stream type
    pub fn into_chunk_stream(self) -> ChunkStream {
        Box::pin(self)
    }
}

impl<S> Stream for ChunkDecoder<S>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    type Item = ProviderChunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = this.pending.pop_front() {
                if chunk.is_terminal() {
                    this.terminated = true;
                }
                return Poll::Ready(Some(chunk));
            }

            if this.terminated {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.parser.process_bytes(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!("provider transport error: {}", e);
                    this.pending.push_back(ProviderChunk::Error(e.to_string()));
                }
                Poll::Ready(None) => {
                    // Upstream closed without a sentinel; treat as complete
                    this.pending.push_back(ProviderChunk::Done);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
