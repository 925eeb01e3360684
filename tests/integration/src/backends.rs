//! Mock model backends speaking the wire formats the gateway adapters expect.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{any, body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Model name the cloud backend is configured with
pub const CLOUD_MODEL: &str = "gpt-4o-mini";
/// Model name the local backend is configured with
pub const LOCAL_MODEL: &str = "llama3.1";

/// OpenAI-compatible backend: `/v1/chat/completions`, SSE streaming
pub struct CloudBackend {
    server: MockServer,
}

impl CloudBackend {
    /// Start an empty backend
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Base URL to configure the gateway with
    pub fn endpoint(&self) -> String {
        self.server.uri()
    }

    /// Answer whole-result calls with `text`
    pub async fn completes_with(&self, text: &str) {
        self.completion(text, None).mount(&self.server).await;
    }

    /// Answer whole-result calls with `text`, but only after `delay`
    pub async fn completes_slowly(&self, text: &str, delay: Duration) {
        self.completion(text, Some(delay)).mount(&self.server).await;
    }

    /// Fail every chat call with `status`
    pub async fn fails_with(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({"error": {"message": "backend unavailable"}})),
            )
            .mount(&self.server)
            .await;
    }

    /// Stream `fragments`; without `complete` the stream stops before `[DONE]`
    pub async fn streams(&self, fragments: &[&str], complete: bool) {
        stream_mock(fragments, complete).mount(&self.server).await;
    }

    /// Like [`Self::streams`], but only for the next call
    pub async fn streams_once(&self, fragments: &[&str], complete: bool) {
        stream_mock(fragments, complete)
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Answer the health check with `status`
    pub async fn models_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"data": []})))
            .mount(&self.server)
            .await;
    }

    /// Chat calls received so far, as JSON bodies
    pub async fn chat_bodies(&self) -> Vec<Value> {
        chat_bodies(&self.server, "/v1/chat/completions").await
    }

    fn completion(&self, text: &str, delay: Option<Duration>) -> Mock {
        let mut response = ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "model": CLOUD_MODEL,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        }));
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(response)
    }
}

fn stream_mock(fragments: &[&str], complete: bool) -> Mock {
    let mut body = String::new();
    for fragment in fragments {
        let chunk = json!({
            "choices": [{"index": 0, "delta": {"content": fragment}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    if complete {
        let last = json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]});
        body.push_str(&format!("data: {last}\n\ndata: [DONE]\n\n"));
    }
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
}

/// Ollama-compatible backend: `/api/chat`, NDJSON streaming
pub struct LocalBackend {
    server: MockServer,
}

impl LocalBackend {
    /// Start an empty backend
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Base URL to configure the gateway with
    pub fn endpoint(&self) -> String {
        self.server.uri()
    }

    /// Answer whole-result calls with `text`
    pub async fn completes_with(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": LOCAL_MODEL,
                "message": {"role": "assistant", "content": text},
                "done": true
            })))
            .mount(&self.server)
            .await;
    }

    /// Fail every chat call with `status`
    pub async fn fails_with(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"error": "model not loaded"})),
            )
            .mount(&self.server)
            .await;
    }

    /// Stream `fragments` as NDJSON lines, ending with `"done": true`
    pub async fn streams(&self, fragments: &[&str]) {
        let mut body = String::new();
        for fragment in fragments {
            let line = json!({
                "message": {"role": "assistant", "content": fragment},
                "done": false
            });
            body.push_str(&line.to_string());
            body.push('\n');
        }
        let last = json!({"message": {"role": "assistant", "content": ""}, "done": true});
        body.push_str(&last.to_string());
        body.push('\n');

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&self.server)
            .await;
    }

    /// Answer the health check with `status`
    pub async fn tags_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"models": []})))
            .mount(&self.server)
            .await;
    }

    /// Fail the test if this backend receives any request
    pub async fn expect_untouched(&self) {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .named("local backend must not be called")
            .mount(&self.server)
            .await;
    }

    /// Chat calls received so far, as JSON bodies
    pub async fn chat_bodies(&self) -> Vec<Value> {
        chat_bodies(&self.server, "/api/chat").await
    }
}

async fn chat_bodies(server: &MockServer, chat_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request: &&Request| request.url.path() == chat_path)
        .filter_map(|request| serde_json::from_slice(&request.body).ok())
        .collect()
}
