//! Configuration loading: file, then environment overrides, then validation.

use crate::config::{GatewayConfig, LogFormat};
use crate::error::{ConfigError, ConfigResult};
use gateway_core::ProviderIdentity;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Variable naming the config file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

/// Files tried, in order, when no path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "config/gateway.yaml",
    "config/gateway.yml",
    "config/gateway.toml",
    "config/gateway.json",
];

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builder-style loader
#[derive(Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: EnvLookup,
    apply_env: bool,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("file", &self.file)
            .field("apply_env", &self.apply_env)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading the process environment
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            env: Arc::new(|name| std::env::var(name).ok()),
            apply_env: true,
        }
    }

    /// Read this file instead of probing
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Replace the environment lookup
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Skip environment overrides
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.apply_env = false;
        self
    }

    /// Load, override and validate
    ///
    /// # Errors
    /// Returns error on unreadable or unparsable files, bad overrides, or
    /// validation failures
    pub async fn load(&self) -> ConfigResult<GatewayConfig> {
        let mut config = match self.resolve_path() {
            Some(path) => load_from_path(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                GatewayConfig::default()
            }
        };

        if self.apply_env {
            apply_env_overrides(&mut config, self.env.as_ref())?;
        }

        config.validate_all()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.file {
            return Some(path.clone());
        }
        if let Some(path) = (self.env)(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }
}

/// Load configuration from the default locations and the process environment
///
/// # Errors
/// See [`ConfigLoader::load`]
pub async fn load_config() -> ConfigResult<GatewayConfig> {
    ConfigLoader::new().load().await
}

/// Parse a config file, choosing the format by extension
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub async fn load_from_path(path: &Path) -> ConfigResult<GatewayConfig> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let config = match extension.as_deref() {
        Some("yaml" | "yml") => parse_yaml(&contents)?,
        Some("toml") => parse_toml(&contents)?,
        Some("json") => parse_json(&contents)?,
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    info!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

/// Parse YAML text
///
/// # Errors
/// Returns error on malformed input
pub fn parse_yaml(contents: &str) -> ConfigResult<GatewayConfig> {
    serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        format: "yaml",
        message: e.to_string(),
    })
}

/// Parse TOML text
///
/// # Errors
/// Returns error on malformed input
pub fn parse_toml(contents: &str) -> ConfigResult<GatewayConfig> {
    toml::from_str(contents).map_err(|e| ConfigError::Parse {
        format: "toml",
        message: e.to_string(),
    })
}

/// Parse JSON text
///
/// # Errors
/// Returns error on malformed input
pub fn parse_json(contents: &str) -> ConfigResult<GatewayConfig> {
    serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
        format: "json",
        message: e.to_string(),
    })
}

/// Apply environment overrides on top of a loaded configuration
///
/// # Errors
/// Returns error if a set variable cannot be parsed
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String> + ?Sized,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = get("GATEWAY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("GATEWAY_PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| {
                ConfigError::invalid_env("GATEWAY_PORT", format!("'{port}' is not a port"))
            })?;
    }
    if let Some(primary) = get("GATEWAY_PRIMARY_PROVIDER") {
        config.providers.primary = primary
            .parse()
            .map_err(|e: gateway_core::GatewayError| {
                ConfigError::invalid_env("GATEWAY_PRIMARY_PROVIDER", e.to_string())
            })?;
    }
    if let Some(enabled) = get("GATEWAY_FALLBACK_ENABLED") {
        config.providers.fallback_enabled = parse_bool("GATEWAY_FALLBACK_ENABLED", &enabled)?;
    }
    if let Some(timeout) = get("GATEWAY_ATTEMPT_TIMEOUT") {
        config.generation.attempt_timeout = parse_duration("GATEWAY_ATTEMPT_TIMEOUT", &timeout)?;
    }

    if let Some(endpoint) = get("CLOUD_MODEL_ENDPOINT") {
        config.providers.endpoint_mut(ProviderIdentity::CloudModel).endpoint = endpoint;
    }
    if let Some(model) = get("CLOUD_MODEL_NAME") {
        config.providers.endpoint_mut(ProviderIdentity::CloudModel).model = model;
    }
    if let Some(key) = get("CLOUD_MODEL_API_KEY") {
        config.providers.endpoint_mut(ProviderIdentity::CloudModel).api_key =
            Some(SecretString::new(key));
    }
    if let Some(endpoint) = get("LOCAL_MODEL_ENDPOINT") {
        config.providers.endpoint_mut(ProviderIdentity::LocalModel).endpoint = endpoint;
    }
    if let Some(model) = get("LOCAL_MODEL_NAME") {
        config.providers.endpoint_mut(ProviderIdentity::LocalModel).model = model;
    }

    if let Some(level) = get("GATEWAY_LOG_LEVEL") {
        config.telemetry.log_level = level;
    }
    if let Some(format) = get("GATEWAY_LOG_FORMAT") {
        config.telemetry.log_format = format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::invalid_env("GATEWAY_LOG_FORMAT", e))?;
    }

    Ok(())
}

fn parse_bool(var: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid_env(var, format!("'{other}' is not a boolean"))),
    }
}

fn parse_duration(var: &str, value: &str) -> ConfigResult<Duration> {
    humantime_serde::re::humantime::parse_duration(value.trim())
        .map_err(|e| ConfigError::invalid_env(var, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const YAML: &str = r"
server:
  port: 9090
providers:
  primary: local
  local:
    endpoint: http://localhost:11434
    model: llama3.1
    timeout: 20s
  cloud:
    endpoint: https://api.example.com
    model: gpt-4o-mini
    api_key_env: CLOUD_KEY
generation:
  attempt_timeout: 15s
guardrail:
  policies:
    workout:
      disclaimer: Stop if you feel chest pain.
";

    #[test]
    fn test_parse_yaml() {
        let config = parse_yaml(YAML).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.providers.primary, ProviderIdentity::LocalModel);
        assert_eq!(config.generation.attempt_timeout, Duration::from_secs(15));
        let local = config.providers.local.as_ref().unwrap();
        assert_eq!(local.timeout, Duration::from_secs(20));
        assert_eq!(local.max_concurrent, 64);
        assert!(config.guardrail.policy_for("workout").disclaimer.is_some());
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[providers]
primary = "cloud"
fallback_enabled = false

[providers.cloud]
endpoint = "https://api.example.com"
model = "gpt-4o-mini"
"#;
        let config = parse_toml(toml).unwrap();
        assert!(!config.providers.fallback_enabled);
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_parse_error() {
        let err = parse_yaml("server: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "yaml", .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = parse_yaml(YAML).unwrap();
        let lookup = env(&[
            ("GATEWAY_PORT", "7000"),
            ("GATEWAY_PRIMARY_PROVIDER", "cloud"),
            ("GATEWAY_FALLBACK_ENABLED", "false"),
            ("GATEWAY_ATTEMPT_TIMEOUT", "2s"),
            ("CLOUD_MODEL_NAME", "gpt-4.1"),
            ("GATEWAY_LOG_FORMAT", "json"),
        ]);
        apply_env_overrides(&mut config, &lookup).unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.providers.primary, ProviderIdentity::CloudModel);
        assert!(!config.providers.fallback_enabled);
        assert_eq!(config.generation.attempt_timeout, Duration::from_secs(2));
        assert_eq!(config.providers.cloud.as_ref().unwrap().model, "gpt-4.1");
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn test_env_creates_missing_provider_section() {
        let mut config = GatewayConfig::default();
        let lookup = env(&[("LOCAL_MODEL_ENDPOINT", "http://gpu-box:11434")]);
        apply_env_overrides(&mut config, &lookup).unwrap();

        let local = config.providers.local.as_ref().unwrap();
        assert_eq!(local.endpoint, "http://gpu-box:11434");
        assert_eq!(local.model, "llama3.1");
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, &env(&[("GATEWAY_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "GATEWAY_PORT"));

        let err = apply_env_overrides(&mut config, &env(&[("GATEWAY_PRIMARY_PROVIDER", "azure")]))
            .unwrap_err();
        assert!(err.to_string().contains("GATEWAY_PRIMARY_PROVIDER"));
    }

    #[tokio::test]
    async fn test_loader_reads_file_and_env() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_env(env(&[("GATEWAY_HOST", "127.0.0.1")]))
            .load()
            .await
            .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
    }

    #[tokio::test]
    async fn test_loader_uses_config_path_env() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"providers":{"cloud":{"endpoint":"http://c.test","model":"m"}}}"#)
            .unwrap();
        let path = file.path().display().to_string();

        let config = ConfigLoader::new()
            .with_env(move |name| (name == CONFIG_PATH_ENV).then(|| path.clone()))
            .load()
            .await
            .unwrap();

        assert_eq!(config.providers.cloud.unwrap().model, "m");
    }

    #[tokio::test]
    async fn test_loader_validates() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(b"providers:\n  primary: local\n").unwrap();

        let err = ConfigLoader::new()
            .with_file(file.path())
            .without_env()
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = load_from_path(file.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }
}
