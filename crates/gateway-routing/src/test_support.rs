//! In-memory providers and observers for orchestrator tests.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use gateway_core::{
    CallContext, FragmentStream, GatewayError, GatewayResult, GenerationObserver,
    GenerationRequest, GenerationResult, HealthStatus, LLMProvider, ProviderIdentity,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Provider whose behaviour is fixed up front
pub(crate) struct ScriptedProvider {
    identity: ProviderIdentity,
    completion: GatewayResult<String>,
    delay: Option<Duration>,
    open_error: Option<GatewayError>,
    fragments: Vec<GatewayResult<String>>,
    fragments_by_prompt: HashMap<String, Vec<GatewayResult<String>>>,
    hang: bool,
    complete_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    stream_dropped: Arc<AtomicBool>,
}

impl ScriptedProvider {
    pub(crate) fn new(identity: ProviderIdentity) -> Self {
        Self {
            identity,
            completion: Ok(String::new()),
            delay: None,
            open_error: None,
            fragments: Vec::new(),
            fragments_by_prompt: HashMap::new(),
            hang: false,
            complete_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn completes(mut self, text: &str) -> Self {
        self.completion = Ok(text.to_string());
        self
    }

    pub(crate) fn fails(mut self, error: GatewayError) -> Self {
        self.completion = Err(error);
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn streams(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|f| Ok((*f).to_string())).collect();
        self
    }

    pub(crate) fn then_fails(mut self, error: GatewayError) -> Self {
        self.fragments.push(Err(error));
        self
    }

    /// Stream `fragments` instead of the default script for one prompt
    pub(crate) fn streams_for(
        mut self,
        prompt: &str,
        fragments: Vec<GatewayResult<String>>,
    ) -> Self {
        self.fragments_by_prompt.insert(prompt.to_string(), fragments);
        self
    }

    pub(crate) fn fails_to_open(mut self, error: GatewayError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Keep the stream open after the scripted fragments
    pub(crate) fn hangs(mut self) -> Self {
        self.hang = true;
        self
    }

    pub(crate) fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn identity(&self) -> ProviderIdentity {
        self.identity
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn endpoint(&self) -> &str {
        "memory://scripted"
    }

    async fn complete(&self, _request: &GenerationRequest) -> GatewayResult<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completion.clone()
    }

    async fn stream(&self, request: &GenerationRequest) -> GatewayResult<FragmentStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        let flag = DropFlag(Arc::clone(&self.stream_dropped));
        let fragments = self
            .fragments_by_prompt
            .get(request.prompt())
            .unwrap_or(&self.fragments)
            .clone();
        // Yield between fragments so concurrent streams interleave.
        let scripted = stream::iter(fragments).then(|item| async move {
            tokio::task::yield_now().await;
            item
        });
        let tail: FragmentStream = if self.hang {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };
        Ok(scripted
            .chain(tail)
            .map(move |item| {
                let _alive = &flag;
                item
            })
            .boxed())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

/// Observer that records each hook as a short event string
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl GenerationObserver for RecordingObserver {
    fn on_start(&self, ctx: &CallContext) {
        self.push(format!("start:{}", ctx.mode.as_str()));
    }

    fn on_attempt_failed(
        &self,
        _ctx: &CallContext,
        provider: ProviderIdentity,
        error: &GatewayError,
    ) {
        self.push(format!("attempt_failed:{provider}:{}", error.kind()));
    }

    fn on_fallback(&self, _ctx: &CallContext, from: ProviderIdentity, to: ProviderIdentity) {
        self.push(format!("fallback:{from}->{to}"));
    }

    fn on_guardrail_degraded(&self, _ctx: &CallContext, reason: &str) {
        self.push(format!("degraded:{reason}"));
    }

    fn on_complete(&self, _ctx: &CallContext, result: &GenerationResult, tokens: Option<usize>) {
        self.push(format!(
            "complete:{}:{}",
            result.provider_used,
            tokens.map_or_else(|| "-".to_string(), |t| t.to_string())
        ));
    }

    fn on_error(&self, _ctx: &CallContext, error: &GatewayError) {
        self.push(format!("error:{}", error.kind()));
    }

    fn on_cancelled(&self, _ctx: &CallContext, tokens_delivered: usize) {
        self.push(format!("cancelled:{tokens_delivered}"));
    }
}
