//! Gateway configuration model.
//!
//! Every section has serde defaults so a partial file (or no file at all)
//! yields a usable configuration once the primary provider is described.

use crate::error::{ConfigError, ConfigResult};
use gateway_core::ProviderIdentity;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GatewayConfig {
    /// HTTP listener settings
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Backend providers and selection policy
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Output safety policies
    #[serde(default)]
    #[validate(nested)]
    pub guardrail: GuardrailConfig,

    /// Logging, tracing and metrics
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl GatewayConfig {
    /// Validate field rules and cross-field constraints
    ///
    /// # Errors
    /// Returns the first violation found
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        self.providers.validate_providers()?;

        if self.generation.attempt_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "generation.attempt_timeout must be greater than zero".to_string(),
            ));
        }
        if self.generation.default_content_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "generation.default_content_type must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Time allowed for in-flight requests after a shutdown signal
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Provider selection policy plus per-backend connection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Provider tried first
    #[serde(default)]
    pub primary: ProviderIdentity,

    /// Whether the other provider may take over a failed call
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    /// Cloud-hosted backend, OpenAI-compatible
    #[serde(default)]
    pub cloud: Option<ProviderEndpointConfig>,

    /// Locally-hosted backend, Ollama-compatible
    #[serde(default)]
    pub local: Option<ProviderEndpointConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: ProviderIdentity::default(),
            fallback_enabled: true,
            cloud: None,
            local: None,
        }
    }
}

impl ProvidersConfig {
    /// Connection parameters for one backend
    #[must_use]
    pub fn endpoint(&self, identity: ProviderIdentity) -> Option<&ProviderEndpointConfig> {
        match identity {
            ProviderIdentity::CloudModel => self.cloud.as_ref(),
            ProviderIdentity::LocalModel => self.local.as_ref(),
        }
    }

    /// Mutable connection parameters, created with backend defaults if absent
    pub fn endpoint_mut(&mut self, identity: ProviderIdentity) -> &mut ProviderEndpointConfig {
        let slot = match identity {
            ProviderIdentity::CloudModel => &mut self.cloud,
            ProviderIdentity::LocalModel => &mut self.local,
        };
        slot.get_or_insert_with(|| ProviderEndpointConfig::defaults_for(identity))
    }

    /// The provider to fall back to, if fallback can happen at all
    #[must_use]
    pub fn secondary(&self) -> Option<ProviderIdentity> {
        let other = self.primary.other();
        (self.fallback_enabled && self.endpoint(other).is_some()).then_some(other)
    }

    fn validate_providers(&self) -> ConfigResult<()> {
        if self.endpoint(self.primary).is_none() {
            return Err(ConfigError::Validation(format!(
                "primary provider '{}' has no providers.{} section",
                self.primary, self.primary
            )));
        }

        for identity in ProviderIdentity::ALL {
            if let Some(endpoint) = self.endpoint(identity) {
                endpoint
                    .validate()
                    .map_err(|e| ConfigError::Validation(format!("providers.{identity}: {e}")))?;
                url::Url::parse(&endpoint.endpoint).map_err(|e| {
                    ConfigError::Validation(format!(
                        "providers.{identity}.endpoint '{}' is not a valid URL: {e}",
                        endpoint.endpoint
                    ))
                })?;
                if endpoint.timeout.is_zero() {
                    return Err(ConfigError::Validation(format!(
                        "providers.{identity}.timeout must be greater than zero"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Connection parameters for one backend
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProviderEndpointConfig {
    /// Base URL of the backend
    #[validate(length(min = 1))]
    pub endpoint: String,

    /// Model name sent with every request
    #[validate(length(min = 1))]
    pub model: String,

    /// Inline credential
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Environment variable holding the credential
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// HTTP request timeout
    #[serde(default = "default_provider_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum concurrent calls to this backend
    #[serde(default = "default_max_concurrent")]
    #[validate(range(min = 1, max = 10_000))]
    pub max_concurrent: usize,

    /// How long a call may wait for a concurrency slot
    #[serde(default = "default_queue_timeout", with = "humantime_serde")]
    pub queue_timeout: Duration,
}

impl ProviderEndpointConfig {
    /// Create parameters for a backend with remaining fields defaulted
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            api_key_env: None,
            timeout: default_provider_timeout(),
            max_concurrent: default_max_concurrent(),
            queue_timeout: default_queue_timeout(),
        }
    }

    /// Conventional defaults for a backend
    #[must_use]
    pub fn defaults_for(identity: ProviderIdentity) -> Self {
        match identity {
            ProviderIdentity::CloudModel => Self::new("https://api.openai.com", "gpt-4o-mini"),
            ProviderIdentity::LocalModel => Self::new("http://localhost:11434", "llama3.1"),
        }
    }

    /// Set the inline credential
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Set the HTTP request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the concurrency bound
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Credential from the inline value, else from `api_key_env`
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Credential resolution with an injectable variable lookup
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Option<SecretString>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = &self.api_key {
            if !key.expose_secret().is_empty() {
                return Some(key.clone());
            }
        }
        self.api_key_env
            .as_deref()
            .and_then(lookup)
            .filter(|value| !value.is_empty())
            .map(SecretString::new)
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Bound on each whole-result provider attempt
    #[serde(default = "default_attempt_timeout", with = "humantime_serde")]
    pub attempt_timeout: Duration,

    /// Content type assumed when a request names none
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: default_attempt_timeout(),
            default_content_type: default_content_type(),
        }
    }
}

/// Output safety policies
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GuardrailConfig {
    /// Whether output is filtered at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Larger inputs pass through unfiltered and are flagged degraded
    #[serde(default = "default_max_input_bytes")]
    #[validate(range(min = 1))]
    pub max_input_bytes: usize,

    /// Policy for content types with no entry in `policies`
    #[serde(default)]
    pub default_policy: ContentPolicy,

    /// Per content type policies
    #[serde(default = "default_policies")]
    pub policies: HashMap<String, ContentPolicy>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_input_bytes: default_max_input_bytes(),
            default_policy: ContentPolicy::default(),
            policies: default_policies(),
        }
    }
}

impl GuardrailConfig {
    /// Policy applied to a content type
    #[must_use]
    pub fn policy_for(&self, content_type: &str) -> &ContentPolicy {
        self.policies
            .get(content_type)
            .unwrap_or(&self.default_policy)
    }
}

/// Filtering steps for one content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPolicy {
    /// Remove HTML tags and script/style bodies
    #[serde(default = "default_true")]
    pub strip_markup: bool,

    /// Replace e-mail, phone, SSN-like and card-like numbers with markers
    #[serde(default = "default_true")]
    pub redact_pii: bool,

    /// Text appended after the output, once
    #[serde(default)]
    pub disclaimer: Option<String>,

    /// Custom regex rewrites, applied in order
    #[serde(default)]
    pub rules: Vec<RewriteRule>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            strip_markup: true,
            redact_pii: true,
            disclaimer: None,
            rules: Vec::new(),
        }
    }
}

/// A regex rewrite applied to model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Rule name for logs
    pub name: String,
    /// Regex to search for
    pub pattern: String,
    /// Replacement text; `$1`-style group references are allowed
    #[serde(default)]
    pub replacement: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging, tracing and metrics settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryConfig {
    /// Default log filter directive
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub log_level: String,

    /// Log line format
    #[serde(default)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; tracing export is off when absent
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Trace sampling ratio
    #[serde(default = "default_sample_rate")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub sample_rate: f64,

    /// Whether `/metrics` is served
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            otlp_endpoint: None,
            sample_rate: default_sample_rate(),
            metrics_enabled: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent() -> usize {
    64
}

fn default_queue_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_content_type() -> String {
    gateway_core::DEFAULT_CONTENT_TYPE.to_string()
}

fn default_max_input_bytes() -> usize {
    256 * 1024
}

fn default_policies() -> HashMap<String, ContentPolicy> {
    let mut policies = HashMap::new();
    policies.insert(
        "health_advice".to_string(),
        ContentPolicy {
            disclaimer: Some(
                "This is general fitness information, not medical advice. \
                 Consult a healthcare professional about symptoms or medication."
                    .to_string(),
            ),
            ..ContentPolicy::default()
        },
    );
    policies
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sample_rate() -> f64 {
    1.0
}
