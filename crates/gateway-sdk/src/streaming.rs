//! Server-sent event parsing for streaming generation.
//!
//! The gateway sends one `message` event per [`StreamChunk`] and, on success,
//! a `result` event with the guardrail-cleared [`GenerationResult`] right
//! before the `done` chunk.

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use gateway_core::{GenerationResult, StreamChunk, RESULT_EVENT};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A stream chunk: token, done or error.
    Chunk(StreamChunk),
    /// The guardrail-cleared result of a successful stream.
    Result(GenerationResult),
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Chunk(chunk) if chunk.is_terminal())
    }
}

pin_project! {
    /// Finite stream of [`StreamEvent`]s for one generation.
    ///
    /// Always ends with a terminal chunk: transport failures and connections
    /// that close early surface as an `Error` chunk.
    pub struct EventStream {
        #[pin]
        inner: BoxStream<'static, StreamEvent>,
        buffer: String,
        result: Option<GenerationResult>,
        done: bool,
    }
}

impl EventStream {
    /// Create an event stream from an SSE byte stream.
    pub fn new<S, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        Self::from_events(parse_sse_stream(stream))
    }

    /// Wrap already-decoded events.
    pub fn from_events<S>(events: S) -> Self
    where
        S: Stream<Item = StreamEvent> + Send + 'static,
    {
        Self {
            inner: events.boxed(),
            buffer: String::new(),
            result: None,
            done: false,
        }
    }

    /// Text of every token received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// The cleared result, once received.
    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    /// Check if the stream is done.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("buffered", &self.buffer.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(event)) => {
                match &event {
                    StreamEvent::Chunk(StreamChunk::Token(text)) => this.buffer.push_str(text),
                    StreamEvent::Result(result) => *this.result = Some(result.clone()),
                    StreamEvent::Chunk(_) => *this.done = true,
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                *this.done = true;
                Poll::Ready(Some(StreamEvent::Chunk(StreamChunk::error(
                    "stream ended before completion",
                ))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Decode one SSE event block into a stream event.
///
/// Comments, keep-alives and unknown events yield `None`.
fn decode_event(block: &str) -> Option<StreamEvent> {
    let mut name = "message";
    let mut data = Vec::new();

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            name = value.trim();
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");

    match name {
        "message" => match serde_json::from_str::<StreamChunk>(&data) {
            Ok(chunk) => Some(StreamEvent::Chunk(chunk)),
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "Skipping malformed chunk");
                None
            }
        },
        RESULT_EVENT => match serde_json::from_str::<GenerationResult>(&data) {
            Ok(result) => Some(StreamEvent::Result(result)),
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "Skipping malformed result");
                None
            }
        },
        other => {
            tracing::debug!(event = other, "Ignoring unknown event");
            None
        }
    }
}

/// Parse an SSE byte stream into events, stopping after the first terminal chunk.
fn parse_sse_stream<S, E>(stream: S) -> impl Stream<Item = StreamEvent>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send,
    E: std::fmt::Display,
{
    async_stream::stream! {
        let mut stream = std::pin::pin!(stream);
        // Raw bytes; a block boundary is ASCII so complete blocks are valid UTF-8.
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(result) = stream.next().await {
            let bytes = match result {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield StreamEvent::Chunk(StreamChunk::error(format!("connection lost: {e}")));
                    return;
                }
            };
            buffer.extend(bytes.iter().filter(|b| **b != b'\r'));

            while let Some(end) = find_block_end(&buffer) {
                let block: Vec<u8> = buffer.drain(..end + 2).collect();
                let Ok(block) = std::str::from_utf8(&block[..end]) else {
                    yield StreamEvent::Chunk(StreamChunk::error("invalid UTF-8 in event stream"));
                    return;
                };
                if let Some(event) = decode_event(block) {
                    let terminal = event.is_terminal();
                    yield event;
                    if terminal {
                        return;
                    }
                }
            }
        }

        if let Ok(rest) = std::str::from_utf8(&buffer) {
            if let Some(event) = decode_event(rest) {
                yield event;
            }
        }
    }
}

fn find_block_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}
