//! Multi-turn chat sessions through the SDK

use crate::backends::*;
use crate::helpers::*;
use gateway_core::ProviderIdentity;
use gateway_sdk::{ChatSession, TurnOutcome};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_retry_after_interruption_completes_the_turn() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.streams_once(&["Ice", " and"], false).await;
    cloud.streams(&["Ice", " and", " rest."], true).await;
    local.expect_untouched().await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let mut session = ChatSession::new(gateway.client());
    let mut shown = String::new();
    let first = session
        .send("I'm feeling sore after leg day", |token| shown.push_str(token))
        .await;

    assert!(matches!(first, TurnOutcome::Interrupted { ref partial, .. } if partial == "Ice and"));
    assert_eq!(shown, "Ice and");
    assert!(session.history().is_empty());
    assert!(session.can_retry());

    let mut retried = String::new();
    let second = session.retry_last(|token| retried.push_str(token)).await;

    assert_eq!(
        second,
        TurnOutcome::Completed {
            text: "Ice and rest.".to_string(),
            provider: Some(ProviderIdentity::CloudModel),
            fell_back: false,
        }
    );
    assert_eq!(retried, "Ice and rest.");
    assert_eq!(session.history().len(), 2);
    assert!(!session.can_retry());

    // Both attempts carried the same prompt under different request ids
    let bodies = cloud.chat_bodies().await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["messages"], bodies[1]["messages"]);
}

#[tokio::test]
async fn test_history_and_system_prompt_are_sent_on_later_turns() {
    let cloud = CloudBackend::start().await;
    let local = LocalBackend::start().await;
    cloud.streams(&["Sounds", " good."], true).await;
    let gateway = TestGateway::with_backends(&cloud, &local).await;

    let mut session = ChatSession::new(gateway.client())
        .with_content_type("fitness")
        .with_system("You are a strength coach.");
    session.send("I squat twice a week", |_| {}).await;
    session.send("Should I add a third day?", |_| {}).await;

    let bodies = cloud.chat_bodies().await;
    assert_eq!(bodies.len(), 2);
    let second: Vec<(&str, &str)> = bodies[1]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["role"].as_str().unwrap(), m["content"].as_str().unwrap()))
        .collect();
    assert_eq!(
        second,
        [
            ("system", "You are a strength coach."),
            ("user", "I squat twice a week"),
            ("assistant", "Sounds good."),
            ("user", "Should I add a third day?"),
        ]
    );
}

#[tokio::test]
async fn test_unreachable_gateway_fails_the_turn() {
    let client = gateway_sdk::Client::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();
    let mut session = ChatSession::new(client);

    let outcome = session.send("Hello?", |_| {}).await;

    assert!(outcome.is_failure());
    assert!(matches!(outcome, TurnOutcome::Failed { .. }));
    assert!(session.history().is_empty());
}
