//! Server-Sent Events (SSE) framing for streaming A2A responses
//!
//! Each SSE event carries one JSON-RPC response envelope in its `data` field.

use std::fmt::Display;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};

use crate::{protocol::error::A2AError, transport::FrameStream};

/// SSE codec splitting a response body into envelope frames
#[derive(Debug, Clone, Default)]
pub struct SseCodec;

impl SseCodec {
    /// Create a new SSE codec
    pub fn new() -> Self {
        Self
    }

    /// Turn an SSE byte stream into a stream of raw envelope frames
    ///
    /// Events without data (keep-alives) are skipped. A failure of the
    /// underlying byte stream is reported as [`A2AError::Transport`].
    pub fn frames<S, B, E>(&self, byte_stream: S) -> FrameStream
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Display + Send + 'static,
    {
        byte_stream
            .eventsource()
            .filter_map(|result| async move {
                match result {
                    Ok(event) if event.data.trim().is_empty() => None,
                    Ok(event) => Some(Ok(event.data)),
                    Err(e) => Some(Err(A2AError::Transport(format!("SSE stream error: {}", e)))),
                }
            })
            .boxed()
    }
}
