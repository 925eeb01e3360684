//! Whole-result generation and operational endpoints

use crate::backends::*;
use crate::helpers::*;
use gateway_core::{GenerationRequest, HealthStatus, ProviderIdentity};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn test_generate_falls_back_when_primary_times_out() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.completes_slowly("too late", Duration::from_secs(3)).await;
    local.completes_with("Rest 60-90s between sets.").await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("How much rest between sets?").build().unwrap();
    let result = gateway.client().generate(&request).await.unwrap();

    assert_eq!(result.text, "Rest 60-90s between sets.");
    assert_eq!(result.provider_used, ProviderIdentity::LocalModel);
    assert!(result.fell_back);
    assert_eq!(result.request_id, *request.id());
}

#[tokio::test]
async fn test_generate_uses_primary_when_healthy() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.completes_with("Aim for three sessions a week.").await;
    local.expect_untouched().await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("How often should I run?").build().unwrap();
    let result = gateway.client().generate(&request).await.unwrap();

    assert_eq!(result.text, "Aim for three sessions a week.");
    assert_eq!(result.provider_used, ProviderIdentity::CloudModel);
    assert!(!result.fell_back);
}

#[tokio::test]
async fn test_history_reaches_the_backend_in_order() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.completes_with("Add five minutes.").await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("How much longer next week?")
        .system("You are a running coach.")
        .message(gateway_core::ChatMessage::user("I ran 20 minutes."))
        .message(gateway_core::ChatMessage::assistant("Nice work."))
        .build()
        .unwrap();
    gateway.client().generate(&request).await.unwrap();

    let bodies = cloud.chat_bodies().await;
    assert_eq!(bodies.len(), 1);
    let roles: Vec<&str> = bodies[0]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["system", "user", "assistant", "user"]);
    assert_eq!(bodies[0]["messages"][3]["content"], "How much longer next week?");
    assert_eq!(bodies[0]["model"], CLOUD_MODEL);
}

#[tokio::test]
async fn test_both_providers_failing_surfaces_secondary_error() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.fails_with(503).await;
    local.fails_with(500).await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("Plan my week").build().unwrap();
    let err = gateway.client().generate(&request).await.unwrap_err();

    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.error_type(), Some("provider_unavailable"));
    assert_eq!(err.provider(), Some(ProviderIdentity::LocalModel));
    assert!(err.is_provider_failure());
}

#[tokio::test]
async fn test_disabled_fallback_surfaces_primary_error() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.fails_with(503).await;
    local.expect_untouched().await;
    let mut config = gateway_config(Some(&cloud), Some(&local));
    config.providers.fallback_enabled = false;
    let gateway = TestGateway::start(config).await;

    let request = GenerationRequest::builder("Plan my week").build().unwrap();
    let err = gateway.client().generate(&request).await.unwrap_err();

    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.provider(), Some(ProviderIdentity::CloudModel));
}

#[tokio::test]
async fn test_guardrail_redacts_and_appends_disclaimer() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud
        .completes_with("<b>Ice it</b> and email coach@example.com if it persists.")
        .await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("My knee hurts after squats")
        .content_type("health_advice")
        .build()
        .unwrap();
    let result = gateway.client().generate(&request).await.unwrap();

    assert!(result.text.starts_with("Ice it and email [REDACTED_EMAIL] if it persists."));
    assert!(!result.text.contains("<b>"));
    assert!(result
        .text
        .ends_with("Consult a healthcare professional about symptoms or medication."));
}

#[tokio::test]
async fn test_blank_prompt_is_rejected_without_provider_calls() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    local.expect_untouched().await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let response = gateway
        .http()
        .post(gateway.url("/v1/generate"))
        .json(&json!({"prompt": "   "}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request");
    assert!(cloud.chat_bodies().await.is_empty());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.completes_with("ok").await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let response = gateway
        .http()
        .post(gateway.url("/v1/generate"))
        .header("x-request-id", "trace-7")
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["x-request-id"], "trace-7");
}

#[tokio::test]
async fn test_health_and_provider_status() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.models_status(200).await;
    local.tags_status(500).await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;
    let client = gateway.client();

    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
    assert!(client.is_healthy().await);

    let providers = client.providers().await.unwrap();
    assert_eq!(providers.len(), 2);
    let status = |identity| {
        providers
            .iter()
            .find(|p| p.provider == identity)
            .map(|p| p.status)
            .unwrap()
    };
    assert_eq!(status(ProviderIdentity::CloudModel), HealthStatus::Healthy);
    assert_eq!(status(ProviderIdentity::LocalModel), HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_metrics_count_fallbacks() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.fails_with(502).await;
    local.completes_with("Walk for ten minutes.").await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let request = GenerationRequest::builder("Cool-down ideas?").build().unwrap();
    gateway.client().generate(&request).await.unwrap();

    let text = gateway
        .http()
        .get(gateway.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains(r#"gateway_fallbacks_total{from="cloud",mode="whole",to="local"} 1"#));
    assert!(text.contains(
        r#"gateway_generations_total{mode="whole",outcome="success",provider="local"} 1"#
    ));
}

#[tokio::test]
async fn test_gateway_stops_on_signal() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;
    let url = gateway.url("/live");
    let http = gateway.http();

    assert!(http.get(&url).send().await.unwrap().status().is_success());
    gateway.stop().await;
    assert!(http.get(&url).send().await.is_err());
}
