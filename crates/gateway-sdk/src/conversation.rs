//! Multi-turn chat over the streaming endpoint.
//!
//! A [`ChatSession`] keeps the completed history, renders tokens as they
//! arrive, and keeps partial text when a stream fails. Retrying is always the
//! caller's decision.

use crate::client::Client;
use crate::error::Result;
use crate::streaming::StreamEvent;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use gateway_core::{
    ChatMessage, GenerationRequest, ProviderIdentity, StreamChunk, DEFAULT_CONTENT_TYPE,
};

/// Something that can open a generation stream for a request.
#[async_trait]
pub trait TurnSource: Send + Sync {
    /// Open a stream of events for `request`.
    async fn open(&self, request: &GenerationRequest) -> Result<BoxStream<'static, StreamEvent>>;
}

#[async_trait]
impl TurnSource for Client {
    async fn open(&self, request: &GenerationRequest) -> Result<BoxStream<'static, StreamEvent>> {
        Ok(self.generate_stream(request).await?.boxed())
    }
}

/// How one turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The answer arrived in full.
    Completed {
        /// Text to display: the cleared text when the gateway sent it,
        /// otherwise the tokens as received.
        text: String,
        /// Provider that answered, when known.
        provider: Option<ProviderIdentity>,
        /// Whether the gateway fell back to its secondary provider.
        fell_back: bool,
    },
    /// Some text arrived before the stream failed.
    Interrupted {
        /// Text received before the failure.
        partial: String,
        /// Failure description.
        message: String,
    },
    /// Nothing arrived.
    Failed {
        /// Failure description.
        message: String,
    },
}

impl TurnOutcome {
    /// Whether a retry affordance should be offered.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Completed { .. })
    }

    fn from_error(partial: String, message: String) -> Self {
        if partial.is_empty() {
            Self::Failed { message }
        } else {
            Self::Interrupted { partial, message }
        }
    }
}

/// A conversation with the gateway.
#[derive(Debug)]
pub struct ChatSession<S> {
    source: S,
    content_type: String,
    system: Option<String>,
    history: Vec<ChatMessage>,
    last_request: Option<GenerationRequest>,
}

impl<S: TurnSource> ChatSession<S> {
    /// Start an empty session.
    pub fn new(source: S) -> Self {
        Self {
            source,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            system: None,
            history: Vec::new(),
            last_request: None,
        }
    }

    /// Set the guardrail content type for every turn.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set the leading system entry for every turn.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Completed user/assistant exchanges, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Content type sent with every turn.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Whether there is a turn that [`retry_last`](Self::retry_last) can repeat.
    pub fn can_retry(&self) -> bool {
        self.last_request.is_some()
    }

    /// Send `prompt`, calling `on_token` for each token as it arrives.
    pub async fn send<F>(&mut self, prompt: impl Into<String>, on_token: F) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        let mut builder = GenerationRequest::builder(prompt)
            .history(self.history.clone())
            .content_type(self.content_type.clone());
        if let Some(system) = &self.system {
            builder = builder.system(system.clone());
        }

        match builder.build() {
            Ok(request) => self.run(request, on_token).await,
            Err(e) => TurnOutcome::Failed {
                message: e.to_string(),
            },
        }
    }

    /// Send the last turn again as a brand-new request.
    ///
    /// Returns `Failed` when there is nothing to retry.
    pub async fn retry_last<F>(&mut self, on_token: F) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        match &self.last_request {
            Some(last) => {
                let request = last.retry();
                self.run(request, on_token).await
            }
            None => TurnOutcome::Failed {
                message: "nothing to retry".to_string(),
            },
        }
    }

    async fn run<F>(&mut self, request: GenerationRequest, mut on_token: F) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        let prompt = request.prompt().to_string();
        self.last_request = Some(request.clone());

        let mut events = match self.source.open(&request).await {
            Ok(events) => events,
            Err(e) => {
                return TurnOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        let mut buffer = String::new();
        let mut cleared = None;

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Chunk(StreamChunk::Token(text)) => {
                    on_token(&text);
                    buffer.push_str(&text);
                }
                StreamEvent::Result(result) => cleared = Some(result),
                StreamEvent::Chunk(StreamChunk::Error(message)) => {
                    return TurnOutcome::from_error(buffer, message);
                }
                StreamEvent::Chunk(StreamChunk::Done) => {
                    let (text, provider, fell_back) = match cleared {
                        Some(result) => (result.text, Some(result.provider_used), result.fell_back),
                        None => (buffer, None, false),
                    };
                    self.history.push(ChatMessage::user(prompt));
                    self.history.push(ChatMessage::assistant(text.clone()));
                    self.last_request = None;
                    return TurnOutcome::Completed {
                        text,
                        provider,
                        fell_back,
                    };
                }
            }
        }

        TurnOutcome::from_error(buffer, "stream ended before completion".to_string())
    }
}
