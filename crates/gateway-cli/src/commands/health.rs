//! Health check command.

use anyhow::Result;
use clap::Args;
use gateway_sdk::{Client, HealthResponse, ProviderStatus};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the health command.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Also check each configured provider
    #[arg(short, long)]
    pub providers: bool,

    /// Timeout in seconds
    #[arg(short, long, default_value = "5")]
    pub timeout: u64,
}

/// Health check response for output.
#[derive(Debug, Serialize)]
pub struct HealthOutput {
    pub gateway: HealthResponse,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<ProviderStatus>>,
}

/// Execute the health command.
pub async fn execute(
    args: HealthArgs,
    base_url: &str,
    api_key: Option<&str>,
    json: bool,
) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    let mut builder = Client::builder()
        .base_url(base_url)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    let client = builder.build()?;

    let spinner =
        (format == OutputFormat::Text).then(|| output::spinner("Checking gateway health..."));
    let start = Instant::now();
    let health = client.health().await;
    let elapsed = start.elapsed();
    let providers = if args.providers {
        Some(client.providers().await)
    } else {
        None
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let gateway = match health {
        Ok(health) => health,
        Err(e) => {
            CommandResult::<HealthOutput>::failure(format!("Failed to reach gateway: {e}"))
                .print(format)?;
            anyhow::bail!("gateway unreachable");
        }
    };

    let providers = match providers.transpose() {
        Ok(providers) => providers,
        Err(e) => {
            output::warning(&format!("Provider health unavailable: {e}"));
            None
        }
    };

    let result = HealthOutput {
        response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        gateway,
        providers,
    };

    match format {
        OutputFormat::Json => CommandResult::success(result).print(format)?,
        OutputFormat::Text => print_text(&result),
    }

    Ok(())
}

fn print_text(result: &HealthOutput) {
    if result.gateway.is_healthy() {
        output::success("Gateway is healthy");
    } else {
        output::warning(&format!("Gateway reports '{}'", result.gateway.status));
    }
    output::key_value("Version", &result.gateway.version);
    output::key_value("Uptime", &format!("{}s", result.gateway.uptime_seconds));
    output::key_value("Response Time", &format!("{}ms", result.response_time_ms));

    if let Some(providers) = &result.providers {
        output::section("Providers");
        for provider in providers {
            output::status(
                &format!(
                    "{} ({} at {}): {:?}",
                    provider.provider, provider.model, provider.endpoint, provider.status
                ),
                provider.status.is_available(),
            );
        }
    }
}
