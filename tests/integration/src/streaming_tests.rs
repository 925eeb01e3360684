//! Streaming generation over server-sent events

use crate::backends::*;
use crate::helpers::*;
use futures::StreamExt;
use gateway_core::{GenerationRequest, ProviderIdentity, StreamChunk};
use gateway_sdk::StreamEvent;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

async fn collect_events(gateway: &TestGateway, prompt: &str) -> Vec<StreamEvent> {
    let request = GenerationRequest::builder(prompt).build().unwrap();
    gateway.client().generate_stream(&request).await.unwrap().collect().await
}

fn tokens(events: &[StreamEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Chunk(chunk) => chunk.as_token(),
            StreamEvent::Result(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn test_interrupted_stream_keeps_tokens_and_does_not_fall_back() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.streams(&["I'm", " feeling", " sore"], false).await;
    local.expect_untouched().await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let events = collect_events(&gateway, "I'm feeling sore after leg day").await;

    assert_eq!(tokens(&events), ["I'm", " feeling", " sore"]);
    assert!(matches!(events.last(), Some(StreamEvent::Chunk(StreamChunk::Error(_)))));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Result(_))));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Chunk(StreamChunk::Done))));
}

#[tokio::test]
async fn test_stream_falls_back_before_first_token() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.fails_with(503).await;
    local.streams(&["Rest", " 60-90s", " between sets."]).await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let events = collect_events(&gateway, "How much rest between sets?").await;

    assert_eq!(tokens(&events), ["Rest", " 60-90s", " between sets."]);
    let result = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::Result(result) => Some(result.clone()),
            StreamEvent::Chunk(_) => None,
        })
        .unwrap();
    assert_eq!(result.text, "Rest 60-90s between sets.");
    assert_eq!(result.provider_used, ProviderIdentity::LocalModel);
    assert!(result.fell_back);
    assert_eq!(events.last(), Some(&StreamEvent::Chunk(StreamChunk::Done)));
}

#[tokio::test]
async fn test_stream_buffer_and_result_are_tracked() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.streams(&["Warm", " up", " first."], true).await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("Before a run?").build().unwrap();
    let mut stream = gateway.client().generate_stream(&request).await.unwrap();
    while stream.next().await.is_some() {}

    assert!(stream.is_done());
    assert_eq!(stream.buffer(), "Warm up first.");
    let result = stream.result().unwrap();
    assert_eq!(result.provider_used, ProviderIdentity::CloudModel);
    assert!(!result.fell_back);
}

#[tokio::test]
async fn test_sse_wire_format() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.streams(&["Hydrate", "."], true).await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let response = gateway
        .http()
        .post(gateway.url("/v1/generate/stream"))
        .json(&json!({"prompt": "Tips?", "content_type": "general"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let body = response.text().await.unwrap();
    let events = sse_events(&body);
    let kinds: Vec<&str> = events.iter().map(|(event, _)| event.as_str()).collect();
    assert_eq!(kinds, ["message", "message", "result", "message"]);

    let first: Value = serde_json::from_str(&events[0].1).unwrap();
    assert_eq!(first, json!({"type": "token", "data": "Hydrate"}));
    let result: Value = serde_json::from_str(&events[2].1).unwrap();
    assert_eq!(result["text"], "Hydrate.");
    let done: Value = serde_json::from_str(&events[3].1).unwrap();
    assert_eq!(done, json!({"type": "done"}));
}

#[tokio::test]
async fn test_stream_rejects_blank_prompt_before_opening() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    local.expect_untouched().await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("ok").build().unwrap();
    let mut body = serde_json::to_value(&request).unwrap();
    body["prompt"] = json!("");
    let response = gateway
        .http()
        .post(gateway.url("/v1/generate/stream"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert!(cloud.chat_bodies().await.is_empty());
}

#[tokio::test]
async fn test_stream_with_no_provider_available_is_one_error_chunk() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.fails_with(503).await;
    local.fails_with(503).await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let events = collect_events(&gateway, "Any plan?").await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Chunk(StreamChunk::Error(_))));
}
