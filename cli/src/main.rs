//! # CogniSentinel Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `cognisentinel` binary. It:
//! - parses the command line with Clap
//! - sets up logging from the `-v` count (or `RUST_LOG`)
//! - loads the layered configuration once
//! - routes to the subcommand handler and reports any error
//!
//! ## Architecture
//!
//! - `commands::`: one module per subcommand (`relay`, `actions`, `launch`, `check`)
//! - `common::`: shared pieces (emotion tagging, networking, processes, terminal output)
//! - `core::`: configuration and error types
//!
//! ## Examples
//!
//! ```bash
//! # Start everything for local development
//! cognisentinel launch
//!
//! # Run only the relay, with debug logging
//! cognisentinel -vv relay --port 9000
//!
//! # Validate the model store
//! cognisentinel check bot
//! ```
//!
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod common;
mod core;

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "cognisentinel",
    about = "🧠 CogniSentinel: emotion-aware support chatbot services",
    long_about = "Web relay, custom action server and launcher for an emotion-aware support chatbot.\n\
                  Conversation logic lives in the model store (bot/) and is served by the dialogue engine.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Configuration file to use instead of searching for cognisentinel.toml.
    #[arg(long, global = true, env = "COGNISENTINEL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Serve the chat page and relay messages to the dialogue engine.
    #[command(alias = "r")]
    Relay(commands::relay::RelayArgs),
    /// Run the custom action server the dialogue engine calls back into.
    #[command(alias = "a")]
    Actions(commands::actions::ActionsArgs),
    /// Start the action server, the dialogue engine and the relay together.
    #[command(alias = "l")]
    Launch(commands::launch::LaunchArgs),
    /// Validate the conversation model store.
    Check(commands::check::CheckArgs),
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => Some(
            std::path::absolute(&path)
                .with_context(|| format!("Invalid config path {}", path.display()))?,
        ),
        None => None,
    };
    let config = crate::core::config::load_config(config_path.as_deref())?;

    match cli.command {
        Commands::Relay(args) => commands::relay::handle_relay(args, config).await,
        Commands::Actions(args) => commands::actions::handle_actions(args, config).await,
        Commands::Launch(args) => {
            let forwarded = commands::launch::ForwardedOptions {
                verbose: cli.verbose,
                config_path,
            };
            commands::launch::handle_launch(args, config, forwarded).await
        }
        Commands::Check(args) => commands::check::handle_check(args, config).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    if let Err(e) = run(cli).await {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn sentinel_cmd() -> Command {
        Command::cargo_bin("cognisentinel").expect("Failed to find cognisentinel binary for testing")
    }

    #[test]
    fn test_main_help_flag() {
        sentinel_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("launch"));
    }

    #[test]
    fn test_main_version_flag() {
        sentinel_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}
