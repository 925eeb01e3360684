//! Request types for the gateway.
//!
//! A [`GenerationRequest`] is built once per user turn and never mutated; a
//! retry is a new request derived with [`GenerationRequest::retry`].

use crate::error::GatewayError;
use crate::types::{MaxTokens, RequestId, Temperature, TopP};
use serde::{Deserialize, Serialize};

/// Content type used when the caller does not supply one
pub const DEFAULT_CONTENT_TYPE: &str = "general";

/// Maximum accepted prompt length in bytes
pub const MAX_PROMPT_BYTES: usize = 32 * 1024;

/// One generation request: prompt, prior conversation, and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GenerationRequestBody")]
pub struct GenerationRequest {
    id: RequestId,
    prompt: String,
    history: Vec<ChatMessage>,
    content_type: String,
    sampling: SamplingParams,
}

impl GenerationRequest {
    /// Create a new builder
    #[must_use]
    pub fn builder(prompt: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(prompt)
    }

    /// Request identifier
    #[must_use]
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// The user's prompt for this turn
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Prior conversation, oldest first
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Guardrail policy tag
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sampling parameters
    #[must_use]
    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    /// Full message list sent to a provider: history followed by the prompt
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.prompt.clone()));
        messages
    }

    /// Derive a brand-new request for a manual retry of this turn.
    ///
    /// Everything but the identifier is carried over.
    #[must_use]
    pub fn retry(&self) -> Self {
        Self {
            id: RequestId::generate(),
            ..self.clone()
        }
    }

    /// Validate the request
    ///
    /// # Errors
    /// Returns error if any field is invalid
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.prompt.trim().is_empty() {
            return Err(GatewayError::validation(
                "prompt cannot be empty",
                Some("prompt"),
            ));
        }

        if self.prompt.len() > MAX_PROMPT_BYTES {
            return Err(GatewayError::validation(
                format!("prompt exceeds {MAX_PROMPT_BYTES} bytes"),
                Some("prompt"),
            ));
        }

        if self.content_type.trim().is_empty() {
            return Err(GatewayError::validation(
                "content_type cannot be empty",
                Some("content_type"),
            ));
        }

        // A system entry is only meaningful as the first message
        if let Some(pos) = self
            .history
            .iter()
            .skip(1)
            .position(|m| m.role == MessageRole::System)
        {
            return Err(GatewayError::validation(
                format!("system message only allowed first in history, found at {}", pos + 1),
                Some("history"),
            ));
        }

        self.sampling.validate()
    }
}

/// Builder for [`GenerationRequest`]
#[derive(Debug)]
pub struct GenerationRequestBuilder {
    id: Option<RequestId>,
    prompt: String,
    history: Vec<ChatMessage>,
    content_type: Option<String>,
    sampling: SamplingParams,
}

impl GenerationRequestBuilder {
    fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: None,
            prompt: prompt.into(),
            history: Vec::new(),
            content_type: None,
            sampling: SamplingParams::default(),
        }
    }

    /// Set the request ID
    #[must_use]
    pub fn id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the leading system entry (instructions plus contextual facts)
    #[must_use]
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.history.retain(|m| m.role != MessageRole::System);
        self.history.insert(0, ChatMessage::system(content));
        self
    }

    /// Replace the conversation history
    #[must_use]
    pub fn history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Append one message to the history
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.history.push(message);
        self
    }

    /// Set the guardrail content type
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the sampling parameters
    #[must_use]
    pub fn sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.sampling.temperature = Some(temperature);
        self
    }

    /// Set max_tokens
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling.max_tokens = Some(max_tokens);
        self
    }

    /// Build and validate the request
    ///
    /// # Errors
    /// Returns error if the request is invalid
    pub fn build(self) -> Result<GenerationRequest, GatewayError> {
        let request = GenerationRequest {
            id: self.id.unwrap_or_else(RequestId::generate),
            prompt: self.prompt,
            history: self.history,
            content_type: self
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            sampling: self.sampling,
        };

        request.validate()?;

        Ok(request)
    }
}

/// Wire form accepted from JSON bodies, before defaults are resolved.
///
/// `GenerationRequest` deserializes through this type with
/// [`DEFAULT_CONTENT_TYPE`]; servers with a configured default resolve it
/// with [`GenerationRequestBody::into_request`].
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequestBody {
    #[serde(default)]
    id: Option<RequestId>,
    prompt: String,
    #[serde(default)]
    history: Vec<ChatMessage>,
    #[serde(default, alias = "contentType")]
    content_type: Option<String>,
    #[serde(default, alias = "samplingParams")]
    sampling: SamplingParams,
}

impl GenerationRequestBody {
    /// Content type named by the caller, if any
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Validate into a request, using `default_content_type` when the body
    /// names none
    ///
    /// # Errors
    /// Returns error if the request is invalid
    pub fn into_request(
        self,
        default_content_type: &str,
    ) -> Result<GenerationRequest, GatewayError> {
        let content_type = self
            .content_type
            .unwrap_or_else(|| default_content_type.to_string());
        let mut builder = GenerationRequestBuilder::new(self.prompt)
            .history(self.history)
            .sampling(self.sampling)
            .content_type(content_type);
        if let Some(id) = self.id {
            builder = builder.id(id);
        }
        builder.build()
    }
}

impl TryFrom<GenerationRequestBody> for GenerationRequest {
    type Error = GatewayError;

    fn try_from(body: GenerationRequestBody) -> Result<Self, Self::Error> {
        body.into_request(DEFAULT_CONTENT_TYPE)
    }
}

/// Sampling parameters forwarded to the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Top-p (nucleus sampling) parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl SamplingParams {
    /// Validate all present parameters
    ///
    /// # Errors
    /// Returns error if any parameter is out of range
    pub fn validate(&self) -> Result<(), GatewayError> {
        self.temperature.map(Temperature::new).transpose()?;
        self.max_tokens.map(MaxTokens::new).transpose()?;
        self.top_p.map(TopP::new).transpose()?;

        if let Some(stop) = &self.stop {
            if stop.len() > 4 {
                return Err(GatewayError::validation(
                    format!("at most 4 stop sequences allowed, got {}", stop.len()),
                    Some("sampling.stop"),
                ));
            }
        }

        Ok(())
    }
}

/// Chat message with role and content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl MessageRole {
    /// Lowercase role name as used by chat-completion APIs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
