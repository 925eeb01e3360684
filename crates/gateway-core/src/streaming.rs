//! Stream session protocol types.
//!
//! A stream is an ordered, finite sequence of [`StreamChunk`]s: any number of
//! `Token`s followed by exactly one terminal `Done` or `Error`.
//!
//! Wire shape (one JSON object per chunk):
//!
//! ```json
//! {"type": "token", "data": "Rest 60-90s"}
//! {"type": "done"}
//! {"type": "error", "data": {"error": "provider cloud unavailable"}}
//! ```

use serde::{Deserialize, Serialize};

/// Server-sent event name carrying the guardrail-cleared result. Chunks use
/// the default `message` event.
pub const RESULT_EVENT: &str = "result";

/// One unit of incremental delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireChunk", from = "WireChunk")]
pub enum StreamChunk {
    /// A text fragment, in provider emission order
    Token(String),
    /// Normal end of stream
    Done,
    /// Abnormal end of stream
    Error(String),
}

impl StreamChunk {
    /// Create a token chunk
    #[must_use]
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token(text.into())
    }

    /// Create an error chunk
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Whether this chunk ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }

    /// Fragment text, if this is a token
    #[must_use]
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(text) => Some(text),
            _ => None,
        }
    }
}

/// Body of an error chunk on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamErrorBody {
    /// Human-readable failure description
    pub error: String,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
enum WireChunk {
    Token(String),
    Done,
    Error(StreamErrorBody),
}

impl From<StreamChunk> for WireChunk {
    fn from(chunk: StreamChunk) -> Self {
        match chunk {
            StreamChunk::Token(text) => Self::Token(text),
            StreamChunk::Done => Self::Done,
            StreamChunk::Error(error) => Self::Error(StreamErrorBody { error }),
        }
    }
}

impl From<WireChunk> for StreamChunk {
    fn from(wire: WireChunk) -> Self {
        match wire {
            WireChunk::Token(text) => Self::Token(text),
            WireChunk::Done => Self::Done,
            WireChunk::Error(body) => Self::Error(body.error),
        }
    }
}
