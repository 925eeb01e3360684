//! CLI argument definitions using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Cardio chat - talk to the cardio generation gateway
#[derive(Parser, Debug)]
#[command(name = "cardio-chat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Gateway server URL
    #[arg(
        short = 'u',
        long,
        env = "GATEWAY_URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    pub url: String,

    /// API key, for gateways behind an authenticating proxy
    #[arg(short = 'k', long, env = "GATEWAY_API_KEY", global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask for fitness guidance
    Chat(commands::chat::ChatArgs),

    /// Check gateway health
    Health(commands::health::HealthArgs),

    /// Validate a gateway configuration file
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Chat(args) => {
                commands::chat::execute(args, &self.url, self.api_key.as_deref(), self.json).await
            }
            Commands::Health(args) => {
                commands::health::execute(args, &self.url, self.api_key.as_deref(), self.json).await
            }
            Commands::Validate(args) => commands::validate::execute(args, self.json).await,
        }
    }
}
