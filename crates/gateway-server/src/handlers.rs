//! HTTP request handlers for the gateway API.

use async_stream::stream;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use gateway_core::{
    GenerationRequest, GenerationRequestBody, GenerationResult, StreamChunk, RESULT_EVENT,
};
use gateway_providers::ProviderHealth;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::{
    debug, error,
    field::{display, Empty},
    instrument, Span,
};

use crate::{
    error::ApiError,
    extractors::{HttpRequestId, JsonBody},
    state::AppState,
};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.orchestrator.registry().is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "no providers available")
    } else {
        (StatusCode::OK, "ready")
    }
}

/// Liveness check endpoint
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    let Some(metrics) = &state.metrics else {
        return ApiError::not_found("metrics are disabled").into_response();
    };

    match metrics.render() {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            ApiError::internal("failed to encode metrics").into_response()
        }
    }
}

/// Whole-result generation
#[instrument(skip_all, fields(http_request_id = %http_id.0, request_id = Empty))]
pub async fn generate(
    State(state): State<AppState>,
    http_id: HttpRequestId,
    JsonBody(body): JsonBody<GenerationRequestBody>,
) -> Result<Json<GenerationResult>, ApiError> {
    let request = resolve_request(&state, body)?;
    debug!(content_type = request.content_type(), "Generate request");
    let result = state.orchestrator.generate(&request).await?;
    Ok(Json(result))
}

/// Streaming generation over server-sent events.
///
/// Every chunk is one `message` event. A `result` event with the cleared text
/// precedes a successful `done` chunk.
#[instrument(skip_all, fields(http_request_id = %http_id.0, request_id = Empty))]
pub async fn generate_stream(
    State(state): State<AppState>,
    http_id: HttpRequestId,
    JsonBody(body): JsonBody<GenerationRequestBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request = resolve_request(&state, body)?;
    debug!(content_type = request.content_type(), "Stream request");
    let mut generation = state.orchestrator.generate_stream(request);

    let events = stream! {
        while let Some(chunk) = generation.next().await {
            if chunk == StreamChunk::Done {
                if let Some(result) = generation.outcome() {
                    yield Ok(result_event(&result));
                }
            }
            yield Ok(chunk_event(&chunk));
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Applies the configured default content type to a body that omitted one.
fn resolve_request(
    state: &AppState,
    body: GenerationRequestBody,
) -> Result<GenerationRequest, ApiError> {
    let request = body.into_request(&state.config.generation.default_content_type)?;
    Span::current().record("request_id", display(request.id()));
    Ok(request)
}

/// Health of every configured provider
pub async fn provider_health(State(state): State<AppState>) -> Json<Vec<ProviderHealth>> {
    Json(state.orchestrator.provider_health().await)
}

fn chunk_event(chunk: &StreamChunk) -> Event {
    Event::default().json_data(chunk).unwrap_or_else(|e| {
        error!(error = %e, "Failed to encode stream chunk");
        Event::default().data(r#"{"type":"error","data":{"error":"encoding failure"}}"#)
    })
}

fn result_event(result: &GenerationResult) -> Event {
    Event::default()
        .event(RESULT_EVENT)
        .json_data(result)
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to encode generation result");
            Event::default().comment("result unavailable")
        })
}
