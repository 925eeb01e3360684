//! # Gateway Config
//!
//! Configuration for the cardio generation gateway: the typed model, a
//! loader for YAML/TOML/JSON files with environment overrides, and
//! validation. Configuration is read once at startup and never reloaded.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    ContentPolicy, GatewayConfig, GenerationConfig, GuardrailConfig, LogFormat,
    ProviderEndpointConfig, ProvidersConfig, RewriteRule, ServerConfig, TelemetryConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{
    apply_env_overrides, load_config, load_from_path, ConfigLoader, CONFIG_PATH_ENV,
    DEFAULT_CONFIG_PATHS,
};
