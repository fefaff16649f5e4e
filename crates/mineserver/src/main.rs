//! mineserver CLI - Minecraft server instance management
//!
//! This is the main entry point for the mineserver command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use mineserver_core::types::LoggingConfig;
use mineserver_core::{AppConfig, HierarchicalConfigLoader, LogFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    init_tracing(cli.verbose, cli.quiet, &config.logging);
    tracing::debug!(?config, "effective configuration");

    match cli.command {
        Commands::Backup(command) => commands::run_backup(command, &config).await,
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let loader = HierarchicalConfigLoader::new().context("Failed to locate config directory")?;
    loader
        .load(cli.config.as_deref())
        .context("Failed to load configuration")
}

/// Initialize tracing with appropriate verbosity
///
/// `-q` and `-v` override the configured level. Logs go to stderr so JSON
/// command output on stdout stays parseable.
fn init_tracing(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info")),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}
