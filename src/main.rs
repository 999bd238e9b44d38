// ABOUTME: Entry point for the skiff CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use skiff::config::{self, Config};
use skiff::error::Result;
use skiff::output::{Output, OutputMode};
use skiff::types::{DeploymentId, OwnerId};
use std::env;
use tracing_subscriber::EnvFilter;

/// Owner used when neither --owner, SKIFF_OWNER, nor USER is set.
const FALLBACK_OWNER: &str = "local";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    let cwd = env::current_dir()?;
    let owner = resolve_owner(cli.owner);

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Deploy { repo_url, settings } => {
            let config = Config::resolve(&cwd)?;
            commands::deploy(config, owner, repo_url, settings, output).await
        }
        Commands::Restart { id } => {
            let config = Config::resolve(&cwd)?;
            commands::restart(config, owner, DeploymentId::new(id), output).await
        }
        Commands::Delete { id } => {
            let config = Config::resolve(&cwd)?;
            commands::delete(config, owner, DeploymentId::new(id), output).await
        }
        Commands::Redeploy { id, settings } => {
            let config = Config::resolve(&cwd)?;
            commands::redeploy(config, owner, DeploymentId::new(id), settings, output).await
        }
        Commands::Status { id } => {
            let config = Config::resolve(&cwd)?;
            commands::status(config, owner, id.map(DeploymentId::new), output).await
        }
    }
}

fn resolve_owner(flag: Option<String>) -> OwnerId {
    let owner = flag
        .filter(|o| !o.trim().is_empty())
        .or_else(|| env::var("USER").ok().filter(|u| !u.trim().is_empty()))
        .unwrap_or_else(|| FALLBACK_OWNER.to_string());
    OwnerId::new(owner)
}
