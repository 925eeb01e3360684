//! Logs and metrics for generation calls.

use crate::metrics::Metrics;
use gateway_core::{
    CallContext, GatewayError, GenerationObserver, GenerationResult, ProviderIdentity,
};
use tracing::{info, warn};

/// Observer that turns orchestrator hooks into structured logs and,
/// when metrics are enabled, Prometheus samples.
#[derive(Debug, Clone, Default)]
pub struct TelemetryObserver {
    metrics: Option<Metrics>,
}

impl TelemetryObserver {
    /// Observer that only logs
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also record metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl GenerationObserver for TelemetryObserver {
    fn on_start(&self, ctx: &CallContext) {
        info!(
            request_id = %ctx.request_id,
            mode = ctx.mode.as_str(),
            content_type = %ctx.content_type,
            "Generation started"
        );
    }

    fn on_attempt_failed(
        &self,
        ctx: &CallContext,
        provider: ProviderIdentity,
        error: &GatewayError,
    ) {
        warn!(
            request_id = %ctx.request_id,
            provider = %provider,
            kind = error.kind(),
            error = %error,
            "Provider attempt failed"
        );
    }

    fn on_fallback(&self, ctx: &CallContext, from: ProviderIdentity, to: ProviderIdentity) {
        info!(
            request_id = %ctx.request_id,
            from = %from,
            to = %to,
            "Falling back to secondary provider"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_fallback(ctx.mode.as_str(), from.as_str(), to.as_str());
        }
    }

    fn on_guardrail_degraded(&self, ctx: &CallContext, reason: &str) {
        warn!(
            request_id = %ctx.request_id,
            content_type = %ctx.content_type,
            reason,
            "Guardrail degraded, text passed through unfiltered"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_guardrail_degraded(&ctx.content_type);
        }
    }

    fn on_complete(&self, ctx: &CallContext, result: &GenerationResult, tokens: Option<usize>) {
        let elapsed = ctx.elapsed();
        info!(
            request_id = %ctx.request_id,
            provider = %result.provider_used,
            fell_back = result.fell_back,
            tokens,
            latency_ms = elapsed.as_millis() as u64,
            "Generation completed"
        );
        if let Some(metrics) = &self.metrics {
            let provider = result.provider_used.as_str();
            metrics.record_generation(
                ctx.mode.as_str(),
                provider,
                "success",
                elapsed.as_secs_f64(),
            );
            if let Some(tokens) = tokens {
                metrics.add_stream_tokens(provider, tokens);
            }
        }
    }

    fn on_error(&self, ctx: &CallContext, error: &GatewayError) {
        let elapsed = ctx.elapsed();
        let provider = error.provider().map_or("none", ProviderIdentity::as_str);
        warn!(
            request_id = %ctx.request_id,
            provider,
            kind = error.kind(),
            error = %error,
            latency_ms = elapsed.as_millis() as u64,
            "Generation failed"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_generation(
                ctx.mode.as_str(),
                provider,
                error.kind(),
                elapsed.as_secs_f64(),
            );
            if let GatewayError::StreamInterrupted { tokens_delivered, .. } = error {
                metrics.record_stream_interrupted(provider);
                metrics.add_stream_tokens(provider, *tokens_delivered);
            }
        }
    }

    fn on_cancelled(&self, ctx: &CallContext, tokens_delivered: usize) {
        info!(
            request_id = %ctx.request_id,
            tokens = tokens_delivered,
            "Stream cancelled by consumer"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_stream_cancelled();
        }
    }
}
