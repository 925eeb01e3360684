//! Cardio chat CLI
//!
//! Command-line client for the cardio generation gateway.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    cli.execute().await
}

/// Initialize tracing/logging based on verbosity and format.
fn init_tracing(verbose: u8, json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so streamed answers stay clean on stdout.
    let subscriber = tracing_subscriber::registry().with(filter);

    // A subscriber installed elsewhere wins.
    let _ = if json {
        subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        subscriber
            .with(fmt::layer().with_target(verbose > 1).with_writer(std::io::stderr))
            .try_init()
    };
}
