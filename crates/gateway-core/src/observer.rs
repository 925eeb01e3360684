//! Explicit instrumentation hooks for generation calls.
//!
//! The orchestrator invokes every registered observer at its call boundary:
//! each call sees exactly one `on_start` and exactly one of `on_complete`,
//! `on_error` or `on_cancelled`.

use crate::error::GatewayError;
use crate::provider::ProviderIdentity;
use crate::response::GenerationResult;
use crate::types::RequestId;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the result is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    /// Whole-result call
    Whole,
    /// Incremental stream
    Stream,
}

impl GenerationMode {
    /// Label used in logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whole => "whole",
            Self::Stream => "stream",
        }
    }
}

/// Per-call information shared with observers
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Request being served
    pub request_id: RequestId,
    /// Guardrail policy tag of the request
    pub content_type: String,
    /// Delivery mode
    pub mode: GenerationMode,
    /// When the call started
    pub started_at: Instant,
}

impl CallContext {
    /// Create a context starting now
    #[must_use]
    pub fn new(
        request_id: RequestId,
        content_type: impl Into<String>,
        mode: GenerationMode,
    ) -> Self {
        Self {
            request_id,
            content_type: content_type.into(),
            mode,
            started_at: Instant::now(),
        }
    }

    /// Time since the call started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Hooks called by the orchestrator. All methods default to no-ops.
pub trait GenerationObserver: Send + Sync {
    /// A call began
    fn on_start(&self, _ctx: &CallContext) {}

    /// One provider attempt failed
    fn on_attempt_failed(
        &self,
        _ctx: &CallContext,
        _provider: ProviderIdentity,
        _error: &GatewayError,
    ) {
    }

    /// The call is moving from one provider to the other
    fn on_fallback(&self, _ctx: &CallContext, _from: ProviderIdentity, _to: ProviderIdentity) {}

    /// The guardrail passed text through unfiltered
    fn on_guardrail_degraded(&self, _ctx: &CallContext, _reason: &str) {}

    /// The call produced a result; `tokens` is the streamed token count
    fn on_complete(&self, _ctx: &CallContext, _result: &GenerationResult, _tokens: Option<usize>) {}

    /// The call ended with an error
    fn on_error(&self, _ctx: &CallContext, _error: &GatewayError) {}

    /// The consumer dropped a stream before its terminal chunk
    fn on_cancelled(&self, _ctx: &CallContext, _tokens_delivered: usize) {}
}

/// Fan-out over a fixed set of observers
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn GenerationObserver>>,
}

impl ObserverSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn GenerationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of observers
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observer is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl GenerationObserver for ObserverSet {
    fn on_start(&self, ctx: &CallContext) {
        self.observers.iter().for_each(|o| o.on_start(ctx));
    }

    fn on_attempt_failed(
        &self,
        ctx: &CallContext,
        provider: ProviderIdentity,
        error: &GatewayError,
    ) {
        self.observers
            .iter()
            .for_each(|o| o.on_attempt_failed(ctx, provider, error));
    }

    fn on_fallback(&self, ctx: &CallContext, from: ProviderIdentity, to: ProviderIdentity) {
        self.observers.iter().for_each(|o| o.on_fallback(ctx, from, to));
    }

    fn on_guardrail_degraded(&self, ctx: &CallContext, reason: &str) {
        self.observers
            .iter()
            .for_each(|o| o.on_guardrail_degraded(ctx, reason));
    }

    fn on_complete(&self, ctx: &CallContext, result: &GenerationResult, tokens: Option<usize>) {
        self.observers
            .iter()
            .for_each(|o| o.on_complete(ctx, result, tokens));
    }

    fn on_error(&self, ctx: &CallContext, error: &GatewayError) {
        self.observers.iter().for_each(|o| o.on_error(ctx, error));
    }

    fn on_cancelled(&self, ctx: &CallContext, tokens_delivered: usize) {
        self.observers
            .iter()
            .for_each(|o| o.on_cancelled(ctx, tokens_delivered));
    }
}
