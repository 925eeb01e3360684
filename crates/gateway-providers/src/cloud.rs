//! Cloud-hosted model adapter.
//!
//! Talks to any OpenAI-compatible chat completions API:
//! - `POST {endpoint}/v1/chat/completions`, bearer authentication
//! - Streaming over server-sent events, terminated by `data: [DONE]`
//! - Explicit refusals (`refusal` field or `content_filter` finish) map to
//!   [`GatewayError::ProviderRejected`]

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
use reqwest_eventsource::{Event, EventSource};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, trace};

const IDENTITY: ProviderIdentity = ProviderIdentity::CloudModel;

/// OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct CloudModelProvider {
    settings: ProviderSettings,
    client: Client,
    completions_url: String,
    models_url: String,
}

impl CloudModelProvider {
    /// Create the adapter and its connection pool
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(settings: ProviderSettings) -> Result<Self, GatewayError> {
        let client = build_client(IDENTITY, &settings)?;
        let completions_url = api_url(&settings.endpoint, "/chat/completions");
        let models_url = api_url(&settings.endpoint, "/models");

        Ok(Self {
            settings,
            client,
            completions_url,
            models_url,
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.settings.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    fn transform_request(&self, request: &GenerationRequest, stream: bool) -> CloudChatRequest {
        let sampling = request.sampling();
        CloudChatRequest {
            model: self.settings.model.clone(),
            messages: request.messages().iter().map(CloudMessage::from).collect(),
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            top_p: sampling.top_p,
            stop: sampling.stop.clone(),
            stream,
        }
    }
}

/// `{endpoint}/v1{path}`, tolerating an endpoint that already ends in `/v1`
fn api_url(endpoint: &str, path: &str) -> String {
    if endpoint.ends_with("/v1") {
        format!("{endpoint}{path}")
    } else {
        format!("{endpoint}/v1{path}")
    }
}

#[async_trait]
impl LLMProvider for CloudModelProvider {
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
        let timeout = self.settings.timeout;
        let body = self.transform_request(request, false);

        debug!(
            request_id = %request.id(),
            model = %self.settings.model,
            "Sending completion request to cloud model"
        );

        let response = self
            .authorize(self.client.post(&self.completions_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(IDENTITY, timeout, &e))?;

        if !response.status().is_success() {
            return Err(error_from_response(IDENTITY, timeout, response).await);
        }

        let parsed: CloudChatResponse = response
            .json()
            .await
            .map_err(|e| classify_transport(IDENTITY, timeout, &e))?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            GatewayError::unavailable(IDENTITY, "malformed response body: no choices")
        })?;

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.is_empty()) {
            return Err(GatewayError::rejected(IDENTITY, refusal, None));
        }
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(GatewayError::rejected(
                IDENTITY,
                "completion blocked by provider content filter",
                None,
            ));
        }

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, GatewayError> {
        let timeout = self.settings.timeout;
        let body = self.transform_request(request, true);

        debug!(
            request_id = %request.id(),
            model = %self.settings.model,
            "Starting streaming request to cloud model"
        );

        let builder = self
            .authorize(self.client.post(&self.completions_url))
            .json(&body);

        let mut event_source = EventSource::new(builder)
            .map_err(|e| GatewayError::internal(format!("failed to create event source: {e}")))?;

        // Wait for the response headers so open failures surface here.
        match event_source.next().await {
            Some(Ok(Event::Open)) => trace!("Cloud model stream opened"),
            Some(Ok(Event::Message(_))) => {
                event_source.close();
                return Err(GatewayError::unavailable(
                    IDENTITY,
                    "event received before stream opened",
                ));
            }
            Some(Err(e)) => {
                event_source.close();
                return Err(map_event_error(timeout, e).await);
            }
            None => {
                return Err(GatewayError::unavailable(IDENTITY, "stream closed before opening"));
            }
        }

        let stream = try_stream! {
            let mut es = event_source;
            let mut finished = false;

            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(msg)) => {
                        let data = msg.data.trim();
                        if data == "[DONE]" {
                            finished = true;
                            break;
                        }

                        let chunk: CloudChunk = serde_json::from_str(data).map_err(|e| {
                            GatewayError::unavailable(
                                IDENTITY,
                                format!("malformed stream chunk: {e}"),
                            )
                        })?;

                        if let Some(err) = chunk.error {
                            Err(GatewayError::unavailable(IDENTITY, err.message))?;
                        }

                        for choice in chunk.choices {
                            match choice.finish_reason.as_deref() {
                                Some("content_filter") => {
                                    Err(GatewayError::rejected(
                                        IDENTITY,
                                        "completion blocked by provider content filter",
                                        None,
                                    ))?;
                                }
                                Some(_) => finished = true,
                                None => {}
                            }
                            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                                yield text;
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        error!(error = %e, "Cloud model stream error");
                        Err(map_event_error(timeout, e).await)?;
                    }
                }
            }

            es.close();
            if !finished {
                Err(GatewayError::unavailable(IDENTITY, "stream ended before completion"))?;
            }
        };

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> HealthStatus {
        let response = self
            .authorize(self.client.get(&self.models_url))
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        match response {
            Ok(resp) => health_from_status(resp.status()),
            Err(e) => {
                error!(error = %e, "Cloud model health check error");
                HealthStatus::Unhealthy
            }
        }
    }
}

async fn map_event_error(timeout: Duration, err: reqwest_eventsource::Error) -> GatewayError {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(_, response) => {
            error_from_response(IDENTITY, timeout, response).await
        }
        reqwest_eventsource::Error::Transport(e) => classify_transport(IDENTITY, timeout, &e),
        other => GatewayError::unavailable(IDENTITY, format!("stream error: {other}")),
    }
}

// ============================================================================
// OpenAI-compatible wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CloudChatRequest {
    model: String,
    messages: Vec<CloudMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct CloudMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for CloudMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CloudChatResponse {
    #[serde(default)]
    choices: Vec<CloudChoice>,
}

#[derive(Debug, Deserialize)]
struct CloudChoice {
    message: CloudResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudChunk {
    #[serde(default)]
    choices: Vec<CloudChunkChoice>,
    #[serde(default)]
    error: Option<CloudStreamError>,
}

#[derive(Debug, Deserialize)]
struct CloudChunkChoice {
    #[serde(default)]
    delta: CloudDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CloudDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudStreamError {
    message: String,
}
