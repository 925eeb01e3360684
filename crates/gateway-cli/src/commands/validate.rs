//! Validate command - validate configuration files.

use anyhow::Result;
use clap::Args;
use gateway_config::{ConfigLoader, GatewayConfig};
use gateway_core::ProviderIdentity;
use gateway_guardrail::SafetyGuardrail;
use serde::Serialize;
use std::path::PathBuf;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate
    pub file: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Validation result.
#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub file: String,
    pub warnings: Vec<ValidationMessage>,
    pub errors: Vec<ValidationMessage>,
}

/// Validation message.
#[derive(Debug, Serialize)]
pub struct ValidationMessage {
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationResult {
    fn new(file: String) -> Self {
        Self {
            valid: true,
            file,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, path: Option<&str>) {
        self.valid = false;
        self.errors.push(ValidationMessage {
            level: "error".to_string(),
            message: message.into(),
            path: path.map(String::from),
        });
    }

    fn warning(&mut self, message: impl Into<String>, path: Option<&str>) {
        self.warnings.push(ValidationMessage {
            level: "warning".to_string(),
            message: message.into(),
            path: path.map(String::from),
        });
    }
}

/// Execute the validate command.
pub async fn execute(args: ValidateArgs, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let mut result = ValidationResult::new(args.file.display().to_string());

    if !args.file.exists() {
        result.error(format!("File not found: {}", args.file.display()), None);
        return print_result(result, format);
    }

    match ConfigLoader::new().with_file(&args.file).without_env().load().await {
        Ok(config) => check_config(&config, &mut result, args.strict),
        Err(e) => result.error(format!("Invalid configuration: {e}"), None),
    }

    print_result(result, format)
}

/// Checks beyond what loading already enforces.
fn check_config(config: &GatewayConfig, result: &mut ValidationResult, strict: bool) {
    if let Err(e) = SafetyGuardrail::new(&config.guardrail) {
        result.error(format!("Guardrail rules do not compile: {e}"), Some("guardrail"));
    }

    let secondary = config.providers.primary.other();
    if config.providers.fallback_enabled && config.providers.endpoint(secondary).is_none() {
        result.warning(
            format!("No providers.{secondary} section; requests will not fall back"),
            Some("providers"),
        );
    }

    if let Some(cloud) = config.providers.endpoint(ProviderIdentity::CloudModel) {
        if cloud.resolve_api_key().is_none() {
            let message = match &cloud.api_key_env {
                Some(var) => {
                    format!("Environment variable '{var}' for the cloud provider is not set")
                }
                None => "Cloud provider has no API key configured".to_string(),
            };
            result.warning(message, Some("providers.cloud.api_key"));
        }
    }

    if !config.guardrail.enabled {
        result.warning(
            "Guardrail is disabled; model output is returned unfiltered",
            Some("guardrail.enabled"),
        );
    }

    if strict && !result.warnings.is_empty() {
        result.valid = false;
    }
}

/// Print the validation result.
fn print_result(result: ValidationResult, format: OutputFormat) -> Result<()> {
    let valid = result.valid;
    match format {
        OutputFormat::Json => {
            if valid {
                CommandResult::success(result).print(format)?;
            } else {
                CommandResult::failure_with(result, "Validation failed").print(format)?;
            }
        }
        OutputFormat::Text => {
            if valid {
                output::success(&format!("Configuration file is valid: {}", result.file));
            } else {
                output::error(&format!("Configuration file is invalid: {}", result.file));
            }

            if !result.errors.is_empty() {
                output::section("Errors");
                for error in &result.errors {
                    match &error.path {
                        Some(path) => output::error(&format!("[{path}] {}", error.message)),
                        None => output::error(&error.message),
                    }
                }
            }

            if !result.warnings.is_empty() {
                output::section("Warnings");
                for warning in &result.warnings {
                    match &warning.path {
                        Some(path) => output::warning(&format!("[{path}] {}", warning.message)),
                        None => output::warning(&warning.message),
                    }
                }
            }
        }
    }

    if valid {
        Ok(())
    } else {
        anyhow::bail!("configuration is invalid")
    }
}
