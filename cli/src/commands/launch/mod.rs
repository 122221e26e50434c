//! # CogniSentinel Launcher
//!
//! File: cli/src/commands/launch/mod.rs
//!
//! ## Overview
//!
//! `cognisentinel launch` brings up the whole stack for local development:
//! the custom action server, the dialogue engine and the web relay, each as
//! its own OS process. It echoes `✓ <process> started on port <port>` as each
//! one comes up and stops all of them on Ctrl+C or when any of them dies.
//!
//! The command takes no flags of its own. The global `-v` and `--config`
//! flags are forwarded to the processes it starts from this binary.
//!
//! ## Examples
//!
//! ```bash
//! cognisentinel launch
//! cognisentinel -v launch
//! ```
//!
use crate::core::config::Config;
use crate::core::error::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

pub mod supervisor;

#[derive(Parser, Debug, Default)]
pub struct LaunchArgs {}

/// Global options passed on to child processes.
#[derive(Debug, Default, Clone)]
pub struct ForwardedOptions {
    pub verbose: u8,
    /// Explicit `--config` file, made absolute.
    pub config_path: Option<PathBuf>,
}

impl ForwardedOptions {
    /// Command-line flags reproducing these options, placed before the subcommand.
    pub fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.verbose > 0 {
            args.push(format!("-{}", "v".repeat(self.verbose as usize)));
        }
        if let Some(path) = &self.config_path {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
        args
    }
}

/// # Handle Launch Command (`handle_launch`)
pub async fn handle_launch(args: LaunchArgs, config: Config, forwarded: ForwardedOptions) -> Result<()> {
    debug!("Handling launch command with args: {:?}", args);
    supervisor::run(&config, &forwarded).await
}
