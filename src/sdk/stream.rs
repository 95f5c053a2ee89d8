//! SSE frame decoding for the client side
//!
//! Buffers raw response bytes, splits complete double-newline-terminated
//! frames, strips the `data: ` prefix and classifies each frame. Bytes are
//! only decoded once a frame is complete, so multi-byte characters split
//! across network reads survive intact.

use futures::future::AbortHandle;
use tracing::warn;

const FRAME_BOUNDARY: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// A decoded downstream frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Incremental completion text
    Content(String),
    /// Terminal sentinel
    Done,
    /// Server-reported error
    Error(String),
}

/// Incremental decoder for the relay's SSE framing
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every complete frame they finish
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();

        while let Some(pos) = find_boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..pos + FRAME_BOUNDARY.len()).collect();
            let text = String::from_utf8_lossy(&block);

            for line in text.lines() {
                let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                    continue;
                };

                if payload.trim() == DONE_SENTINEL {
                    frames.push(Frame::Done);
                    continue;
                }

                match serde_json::from_str::<serde_json::Value>(payload) {
                    Ok(value) => {
                        if let Some(content) = value.get("content").and_then(|c| c.as_str()) {
                            frames.push(Frame::Content(content.to_string()));
                        } else if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
                            frames.push(Frame::Error(error.to_string()));
                        }
                    }
                    Err(e) => {
                        // Tolerate and skip frames that fail to parse
                        warn!("skipping undecodable stream frame: {}", e);
                    }
                }
            }
        }

        frames
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_BOUNDARY.len())
        .position(|window| window == FRAME_BOUNDARY)
}

/// Cancellation handle for an in-flight stream
///
/// Aborts the underlying request future; no further frame callbacks fire
/// after cancellation.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    inner: AbortHandle,
}

impl StreamHandle {
    pub(crate) fn new(inner: AbortHandle) -> Self {
        Self { inner }
    }

    /// Cancel the stream
    pub fn cancel(&self) {
        self.inner.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_content_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: {\"content\":\"Hello\"}\n\n");
        assert_eq!(frames, vec![Frame::Content("Hello".to_string())]);
    }

    #[test]
    fn test_done_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: [DONE]\n\n");
        assert_eq!(frames, vec![Frame::Done]);
    }

    #[test]
    fn test_error_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: {\"error\":\"failed\"}\n\n");
        assert_eq!(frames, vec![Frame::Error("failed".to_string())]);
    }

    #[test]
    fn test_frame_split_across_reads() {
        let mut decoder = FrameDecoder::new();

        assert!(decoder.push(b"data: {\"content\":\"Hel").is_empty());
        let frames = decoder.push(b"lo\"}\n\ndata: [DONE]\n\n");
        assert_eq!(
            frames,
            vec![Frame::Content("Hello".to_string()), Frame::Done]
        );
    }

    #[test]
    fn test_multibyte_split_across_reads() {
        let frame = "data: {\"content\":\"héllo\"}\n\n".as_bytes();
        let split = frame.iter().position(|&b| b == 0xc3).unwrap() + 1;

        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&frame[..split]).is_empty());
        assert_eq!(
            decoder.push(&frame[split..]),
            vec![Frame::Content("héllo".to_string())]
        );
    }

    #[test]
    fn test_undecodable_frame_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames =
            decoder.push(b"data: not-json\n\ndata: {\"content\":\"still works\"}\n\n");
        assert_eq!(frames, vec![Frame::Content("still works".to_string())]);
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(
            b"data: {\"content\":\"The \"}\n\ndata: {\"content\":\"answer is \"}\n\ndata: {\"content\":\"4.\"}\n\ndata: [DONE]\n\n",
        );
        assert_eq!(
            frames,
            vec![
                Frame::Content("The ".to_string()),
                Frame::Content("answer is ".to_string()),
                Frame::Content("4.".to_string()),
                Frame::Done,
            ]
        );
    }
}
