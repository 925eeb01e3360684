//! Generation orchestrator.
//!
//! Owns provider selection and the single-fallback policy for both delivery
//! modes, and applies the guardrail to every successful completion. It has no
//! knowledge of transport.

use crate::selector::ProviderSelector;
use crate::stream::{GenerationStream, StreamRun};
use gateway_config::GatewayConfig;
use gateway_core::{
    CallContext, GatewayError, GatewayResult, GenerationMode, GenerationObserver,
    GenerationRequest, GenerationResult, LLMProvider, ObserverSet, ProviderIdentity,
};
use gateway_guardrail::{Guardrail, SafetyGuardrail};
use gateway_providers::{ProviderHealth, ProviderRegistry};
use gateway_resilience::{with_attempt_timeout, ProviderBulkheads};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

/// Orchestrator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Provider tried first
    pub primary: ProviderIdentity,
    /// Whether a failed primary attempt may fall back to the other provider
    pub fallback_enabled: bool,
    /// Bound on each whole-result attempt, bulkhead wait included
    pub attempt_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            primary: ProviderIdentity::CloudModel,
            fallback_enabled: true,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&GatewayConfig> for OrchestratorConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            primary: config.providers.primary,
            fallback_enabled: config.providers.fallback_enabled,
            attempt_timeout: config.generation.attempt_timeout,
        }
    }
}

/// Entry point for generation calls. Built once and shared behind an `Arc`.
pub struct Orchestrator {
    registry: ProviderRegistry,
    guardrail: Arc<dyn Guardrail>,
    bulkheads: ProviderBulkheads,
    selector: ProviderSelector,
    config: OrchestratorConfig,
    observers: ObserverSet,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator with default bulkheads and no observers
    #[must_use]
    pub fn new(
        registry: ProviderRegistry,
        guardrail: Arc<dyn Guardrail>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            guardrail,
            bulkheads: ProviderBulkheads::default(),
            selector: ProviderSelector::new(config.primary, config.fallback_enabled),
            config,
            observers: ObserverSet::new(),
        }
    }

    /// Build providers, guardrail and bulkheads from the gateway configuration
    ///
    /// # Errors
    /// Returns a configuration error if an adapter or the guardrail cannot be built
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let registry = ProviderRegistry::from_config(&config.providers)?;
        let guardrail = SafetyGuardrail::new(&config.guardrail)
            .map_err(|e| GatewayError::configuration(e.to_string()))?;

        let orchestrator =
            Self::new(registry, Arc::new(guardrail), OrchestratorConfig::from(config))
                .with_bulkheads(ProviderBulkheads::from_config(&config.providers));

        info!(
            primary = %orchestrator.config.primary,
            fallback_enabled = orchestrator.config.fallback_enabled,
            providers = ?orchestrator.registry.identities(),
            "Orchestrator ready"
        );
        Ok(orchestrator)
    }

    /// Replace the per-provider bulkheads
    #[must_use]
    pub fn with_bulkheads(mut self, bulkheads: ProviderBulkheads) -> Self {
        self.bulkheads = bulkheads;
        self
    }

    /// Add an observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn GenerationObserver>) -> Self {
        self.observers = self.observers.with(observer);
        self
    }

    /// Registered providers
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Active settings
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Check every registered provider
    pub async fn provider_health(&self) -> Vec<ProviderHealth> {
        self.registry.health_check_all().await
    }

    /// Produce a whole, guardrail-cleared result.
    ///
    /// At most two provider attempts are made: the primary, then the
    /// secondary once if the primary failed with a provider error.
    ///
    /// # Errors
    /// Validation and configuration errors, or the last attempt's provider error
    pub async fn generate(&self, request: &GenerationRequest) -> GatewayResult<GenerationResult> {
        let ctx = CallContext::new(
            request.id().clone(),
            request.content_type(),
            GenerationMode::Whole,
        );
        let span = info_span!(
            "generate",
            request_id = %request.id(),
            content_type = %request.content_type(),
        );

        self.observers.on_start(&ctx);
        let outcome = self.run_whole(&ctx, request).instrument(span).await;
        match &outcome {
            Ok(result) => self.observers.on_complete(&ctx, result, None),
            Err(error) => self.observers.on_error(&ctx, error),
        }
        outcome
    }

    async fn run_whole(
        &self,
        ctx: &CallContext,
        request: &GenerationRequest,
    ) -> GatewayResult<GenerationResult> {
        request.validate()?;
        let route = self.selector.select(&self.registry)?;
        let primary = route.primary();

        let (raw, provider_used, fell_back) = match self.attempt(primary, request).await {
            Ok(raw) => (raw, primary.identity(), false),
            Err(error) if error.is_fallback_eligible() => {
                self.observers.on_attempt_failed(ctx, primary.identity(), &error);
                let Some(secondary) = route.secondary() else {
                    return Err(error);
                };

                warn!(
                    from = %primary.identity(),
                    to = %secondary.identity(),
                    error = %error,
                    "Primary provider failed, falling back"
                );
                self.observers.on_fallback(ctx, primary.identity(), secondary.identity());

                match self.attempt(secondary, request).await {
                    Ok(raw) => (raw, secondary.identity(), true),
                    Err(error) => {
                        self.observers.on_attempt_failed(ctx, secondary.identity(), &error);
                        return Err(error);
                    }
                }
            }
            Err(error) => return Err(error),
        };

        let verdict = self.guardrail.process(&raw, request.content_type());
        if let Some(reason) = &verdict.degraded {
            self.observers.on_guardrail_degraded(ctx, reason.reason());
        }

        debug!(
            provider = %provider_used,
            fell_back,
            redactions = verdict.redaction_count(),
            "Generation complete"
        );
        Ok(GenerationResult::new(
            request.id().clone(),
            verdict.text,
            provider_used,
            fell_back,
        ))
    }

    /// One `complete` call holding a bulkhead slot. The timeout covers the
    /// wait for the slot as well as the call.
    async fn attempt(
        &self,
        provider: &Arc<dyn LLMProvider>,
        request: &GenerationRequest,
    ) -> GatewayResult<String> {
        let identity = provider.identity();
        with_attempt_timeout(identity, self.config.attempt_timeout, async {
            let _permit = self.bulkheads.acquire(identity).await?;
            provider.complete(request).await
        })
        .await
    }

    /// Start an incremental generation.
    ///
    /// Nothing is sent to a provider until the returned stream is first
    /// polled. Selection and validation failures arrive as the stream's
    /// terminal `Error` chunk.
    #[must_use]
    pub fn generate_stream(&self, request: GenerationRequest) -> GenerationStream {
        let ctx = CallContext::new(
            request.id().clone(),
            request.content_type(),
            GenerationMode::Stream,
        );
        self.observers.on_start(&ctx);

        let route = request
            .validate()
            .and_then(|()| self.selector.select(&self.registry));

        GenerationStream::start(StreamRun {
            request,
            route,
            guardrail: Arc::clone(&self.guardrail),
            bulkheads: self.bulkheads.clone(),
            observers: self.observers.clone(),
            ctx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingObserver, ScriptedProvider};
    use gateway_config::{ContentPolicy, GuardrailConfig};
    use gateway_resilience::BulkheadConfig;

    const CLOUD: ProviderIdentity = ProviderIdentity::CloudModel;
    const LOCAL: ProviderIdentity = ProviderIdentity::LocalModel;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::builder(prompt).build().unwrap()
    }

    fn guardrail() -> Arc<dyn Guardrail> {
        Arc::new(SafetyGuardrail::with_defaults().unwrap())
    }

    fn orchestrator(
        providers: Vec<Arc<ScriptedProvider>>,
        config: OrchestratorConfig,
    ) -> Orchestrator {
        let registry = providers.into_iter().fold(ProviderRegistry::new(), |r, p| {
            r.with_provider(p as Arc<dyn LLMProvider>)
        });
        Orchestrator::new(registry, guardrail(), config)
    }

    fn unavailable(identity: ProviderIdentity) -> GatewayError {
        GatewayError::unavailable(identity, "connection refused")
    }

    #[tokio::test]
    async fn test_primary_success_no_fallback() {
        let cloud = Arc::new(ScriptedProvider::new(CLOUD).completes("Warm up for 10 minutes."));
        let local = Arc::new(ScriptedProvider::new(LOCAL).completes("unused"));
        let orch = orchestrator(vec![cloud.clone(), local.clone()], OrchestratorConfig::default());

        let result = orch.generate(&request("How do I warm up?")).await.unwrap();
        assert_eq!(result.text, "Warm up for 10 minutes.");
        assert_eq!(result.provider_used, CLOUD);
        assert!(!result.fell_back);
        assert_eq!(local.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_each_eligible_error_falls_back_once() {
        let errors = [
            unavailable(CLOUD),
            GatewayError::timeout(CLOUD, Duration::from_secs(1)),
            GatewayError::rejected(CLOUD, "refused", Some(400)),
        ];

        for error in errors {
            let cloud = Arc::new(ScriptedProvider::new(CLOUD).fails(error));
            let local = Arc::new(ScriptedProvider::new(LOCAL).completes("from local"));
            let orch =
                orchestrator(vec![cloud.clone(), local.clone()], OrchestratorConfig::default());

            let result = orch.generate(&request("hi")).await.unwrap();
            assert_eq!(result.provider_used, LOCAL);
            assert!(result.fell_back);
            assert_eq!(cloud.complete_calls(), 1);
            assert_eq!(local.complete_calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_no_secondary_propagates_primary_error() {
        let cloud = Arc::new(ScriptedProvider::new(CLOUD).fails(unavailable(CLOUD)));
        let orch = orchestrator(vec![cloud.clone()], OrchestratorConfig::default());

        let err = orch.generate(&request("hi")).await.unwrap_err();
        assert!(matches!(err, GatewayError::ProviderUnavailable { provider: CLOUD, .. }));
        assert_eq!(cloud.complete_calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_disabled_propagates_primary_error() {
        let cloud = Arc::new(ScriptedProvider::new(CLOUD).fails(unavailable(CLOUD)));
        let local = Arc::new(ScriptedProvider::new(LOCAL).completes("unused"));
        let config = OrchestratorConfig {
            fallback_enabled: false,
            ..OrchestratorConfig::default()
        };
        let orch = orchestrator(vec![cloud, local.clone()], config);

        assert!(orch.generate(&request("hi")).await.is_err());
        assert_eq!(local.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_secondary_error_surfaces_unwrapped() {
        let cloud = Arc::new(ScriptedProvider::new(CLOUD).fails(unavailable(CLOUD)));
        let local = Arc::new(ScriptedProvider::new(LOCAL).fails(
            GatewayError::rejected(LOCAL, "model not found", Some(404)),
        ));
        let orch = orchestrator(vec![cloud, local], OrchestratorConfig::default());

        let err = orch.generate(&request("hi")).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::ProviderRejected { provider: LOCAL, status_code: Some(404), .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_primary_is_configuration_error() {
        let local = Arc::new(ScriptedProvider::new(LOCAL).completes("y"));
        let orch = orchestrator(vec![local.clone()], OrchestratorConfig::default());

        let err = orch.generate(&request("hi")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
        assert_eq!(local.complete_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rest_between_sets_scenario() {
        let cloud = Arc::new(
            ScriptedProvider::new(CLOUD)
                .completes("too late")
                .delayed(Duration::from_secs(120)),
        );
        let local = Arc::new(ScriptedProvider::new(LOCAL).completes("Rest 60-90s between sets."));
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(vec![cloud, local], OrchestratorConfig::default())
            .with_observer(observer.clone());

        let result = orch.generate(&request("How much rest between sets?")).await.unwrap();
        assert_eq!(result.text, "Rest 60-90s between sets.");
        assert_eq!(result.provider_used, LOCAL);
        assert!(result.fell_back);

        assert_eq!(
            observer.events(),
            vec![
                "start:whole",
                "attempt_failed:cloud:provider_timeout",
                "fallback:cloud->local",
                "complete:local:-",
            ]
        );
    }

    #[tokio::test]
    async fn test_result_text_is_guardrail_output() {
        let raw = "<p>Call me at 555-123-4567</p>\n\n\n\n\nthanks   ";
        let cloud = Arc::new(ScriptedProvider::new(CLOUD).completes(raw));
        let orch = orchestrator(vec![cloud], OrchestratorConfig::default());

        let req = request("hi");
        let result = orch.generate(&req).await.unwrap();
        let expected = SafetyGuardrail::with_defaults().unwrap().process(raw, req.content_type());
        assert_eq!(result.text, expected.text);
        assert!(result.text.contains("[REDACTED_PHONE]"));
    }

    #[tokio::test]
    async fn test_guardrail_degradation_is_observed() {
        let config = GuardrailConfig {
            max_input_bytes: 8,
            default_policy: ContentPolicy::default(),
            ..GuardrailConfig::default()
        };
        let guardrail: Arc<dyn Guardrail> = Arc::new(SafetyGuardrail::new(&config).unwrap());
        let cloud = Arc::new(ScriptedProvider::new(CLOUD).completes("<b>longer than eight</b>"));
        let observer = Arc::new(RecordingObserver::default());
        let orch = Orchestrator::new(
            ProviderRegistry::new().with_provider(cloud),
            guardrail,
            OrchestratorConfig::default(),
        )
        .with_observer(observer.clone());

        let result = orch.generate(&request("hi")).await.unwrap();
        assert_eq!(result.text, "<b>longer than eight</b>");
        assert!(observer.events().contains(&"degraded:input_too_large".to_string()));
    }

    fn single_slot(queue_timeout: Duration) -> ProviderBulkheads {
        ProviderBulkheads::uniform(BulkheadConfig {
            max_concurrent: 1,
            queue_timeout,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_generate_queue_timeout_falls_back() {
        let cloud = Arc::new(
            ScriptedProvider::new(CLOUD)
                .completes("Rest 60-90s between sets.")
                .delayed(Duration::from_secs(10)),
        );
        let local = Arc::new(ScriptedProvider::new(LOCAL).completes("Rest a minute."));
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(vec![cloud.clone(), local.clone()], OrchestratorConfig::default())
            .with_bulkheads(single_slot(Duration::from_secs(1)))
            .with_observer(observer.clone());

        let (first, second) = (request("rest?"), request("rest again?"));
        let (first, second) = futures::join!(orch.generate(&first), orch.generate(&second));

        let first = first.unwrap();
        assert_eq!(first.provider_used, CLOUD);
        assert!(!first.fell_back);

        let second = second.unwrap();
        assert_eq!(second.text, "Rest a minute.");
        assert_eq!(second.provider_used, LOCAL);
        assert!(second.fell_back);

        assert_eq!(cloud.complete_calls(), 1);
        assert_eq!(local.complete_calls(), 1);
        assert!(observer
            .events()
            .contains(&"attempt_failed:cloud:provider_unavailable".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_covers_bulkhead_wait() {
        let cloud = Arc::new(
            ScriptedProvider::new(CLOUD)
                .completes("from cloud")
                .delayed(Duration::from_millis(1500)),
        );
        let local = Arc::new(ScriptedProvider::new(LOCAL).completes("from local"));
        let observer = Arc::new(RecordingObserver::default());
        let config = OrchestratorConfig {
            attempt_timeout: Duration::from_secs(2),
            ..OrchestratorConfig::default()
        };
        let orch = orchestrator(vec![cloud.clone(), local.clone()], config)
            .with_bulkheads(single_slot(Duration::from_secs(60)))
            .with_observer(observer.clone());

        let (first, second) = (request("first"), request("second"));
        let (first, second) = futures::join!(orch.generate(&first), orch.generate(&second));

        assert_eq!(first.unwrap().provider_used, CLOUD);
        // 1.5s queued plus a 1.5s call overruns the 2s bound
        let second = second.unwrap();
        assert_eq!(second.provider_used, LOCAL);
        assert!(second.fell_back);
        assert!(observer
            .events()
            .contains(&"attempt_failed:cloud:provider_timeout".to_string()));
    }
}
