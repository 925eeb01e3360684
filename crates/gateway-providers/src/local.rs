//! Locally-hosted model adapter (Ollama-compatible `/api/chat`).
//!
//! Streaming responses are newline-delimited JSON: one object per fragment,
//! the last carrying `"done": true`. An `{"error": ...}` line mid-stream is a
//! provider failure.

use crate::http::{
    build_client, classify_transport, error_from_response, health_from_status, ProviderSettings,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{
    ChatMessage, FragmentStream, GatewayError, GenerationRequest, HealthStatus, LLMProvider,
    ProviderIdentity,
};
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const IDENTITY: ProviderIdentity = ProviderIdentity::LocalModel;

/// Ollama-compatible provider
#[derive(Debug, Clone)]
pub struct LocalModelProvider {
    settings: ProviderSettings,
    client: Client,
    chat_url: String,
    tags_url: String,
}

impl LocalModelProvider {
    /// Create the adapter and its connection pool
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(settings: ProviderSettings) -> Result<Self, GatewayError> {
        let client = build_client(IDENTITY, &settings)?;
        let chat_url = format!("{}/api/chat", settings.endpoint);
        let tags_url = format!("{}/api/tags", settings.endpoint);

        Ok(Self {
            settings,
            client,
            chat_url,
            tags_url,
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.settings.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    fn transform_request(&self, request: &GenerationRequest, stream: bool) -> LocalChatRequest {
        let sampling = request.sampling();
        let options = LocalOptions {
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            num_predict: sampling.max_tokens,
            stop: sampling.stop.clone(),
        };

        LocalChatRequest {
            model: self.settings.model.clone(),
            messages: request.messages().iter().map(LocalMessage::from).collect(),
            stream,
            options: (!options.is_empty()).then_some(options),
        }
    }

    async fn send(&self, body: &LocalChatRequest) -> Result<reqwest::Response, GatewayError> {
        let timeout = self.settings.timeout;
        let response = self
            .authorize(self.client.post(&self.chat_url))
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport(IDENTITY, timeout, &e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(IDENTITY, timeout, response).await)
        }
    }
}

#[async_trait]
impl LLMProvider for LocalModelProvider {
    fn identity(&self) -> ProviderIdentity {
        IDENTITY
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> &str {
        &self.settings.endpoint
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        debug!(
            request_id = %request.id(),
            model = %self.settings.model,
            "Sending completion request to local model"
        );

        let response = self.send(&self.transform_request(request, false)).await?;
        let line: LocalChatLine = response
            .json()
            .await
            .map_err(|e| classify_transport(IDENTITY, self.settings.timeout, &e))?;

        if let Some(message) = line.error {
            return Err(GatewayError::unavailable(IDENTITY, message));
        }

        line.message.map(|m| m.content).ok_or_else(|| {
            GatewayError::unavailable(IDENTITY, "malformed response body: no message")
        })
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, GatewayError> {
        debug!(
            request_id = %request.id(),
            model = %self.settings.model,
            "Starting streaming request to local model"
        );

        let response = self.send(&self.transform_request(request, true)).await?;
        let timeout = self.settings.timeout;

        let stream = try_stream! {
            let mut body = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;

            'read: while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| classify_transport(IDENTITY, timeout, &e))?;
                buffer.extend_from_slice(&chunk);

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let parsed = parse_line(&line)?;
                    if let Some(text) = parsed.fragment {
                        yield text;
                    }
                    if parsed.done {
                        finished = true;
                        break 'read;
                    }
                }
            }

            if !finished && !buffer.is_empty() {
                // Final line without trailing newline
                let parsed = parse_line(&buffer)?;
                if let Some(text) = parsed.fragment {
                    yield text;
                }
                finished = parsed.done;
            }

            if !finished {
                Err(GatewayError::unavailable(IDENTITY, "stream ended before completion"))?;
            }
        };

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> HealthStatus {
        let response = self
            .authorize(self.client.get(&self.tags_url))
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        match response {
            Ok(resp) => health_from_status(resp.status()),
            Err(e) => {
                error!(error = %e, "Local model health check error");
                HealthStatus::Unhealthy
            }
        }
    }
}

#[derive(Debug, Default)]
struct ParsedLine {
    fragment: Option<String>,
    done: bool,
}

fn parse_line(raw: &[u8]) -> Result<ParsedLine, GatewayError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| GatewayError::unavailable(IDENTITY, format!("invalid UTF-8 in stream: {e}")))?
        .trim();
    if text.is_empty() {
        return Ok(ParsedLine::default());
    }

    let line: LocalChatLine = serde_json::from_str(text)
        .map_err(|e| GatewayError::unavailable(IDENTITY, format!("malformed stream line: {e}")))?;

    if let Some(message) = line.error {
        return Err(GatewayError::unavailable(IDENTITY, message));
    }

    // The closing line may still carry text
    Ok(ParsedLine {
        fragment: line.message.map(|m| m.content).filter(|c| !c.is_empty()),
        done: line.done,
    })
}

// ============================================================================
// Ollama wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct LocalChatRequest {
    model: String,
    messages: Vec<LocalMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<LocalOptions>,
}

#[derive(Debug, Serialize)]
struct LocalMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for LocalMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LocalOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

impl LocalOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.num_predict.is_none()
            && self.stop.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct LocalChatLine {
    #[serde(default)]
    message: Option<LocalResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalResponseMessage {
    #[serde(default)]
    content: String,
}
