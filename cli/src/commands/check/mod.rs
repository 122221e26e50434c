//! # CogniSentinel Model Store Check
//!
//! File: cli/src/commands/check/mod.rs
//!
//! `cognisentinel check [DIR]` validates the conversation model store before
//! the engine trains on it. Errors (undeclared intents, missing responses,
//! actions the action server does not serve) fail the command; warnings are
//! printed but do not.
//!
use crate::commands::actions::handlers::registered_action_names;
use crate::common::ui;
use crate::core::config::Config;
use crate::core::error::{Result, SentinelError};
use anyhow::anyhow;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

pub mod model_store;

use model_store::ModelStore;

#[derive(Parser, Debug, Default)]
pub struct CheckArgs {
    /// Model store directory. Defaults to `engine.model_dir` from the configuration.
    pub directory: Option<PathBuf>,
}

/// # Handle Check Command (`handle_check`)
pub async fn handle_check(args: CheckArgs, config: Config) -> Result<()> {
    let dir = args.directory.unwrap_or(config.engine.model_dir);
    debug!("Checking model store at {}", dir.display());

    let store = ModelStore::load(&dir)?;
    let report = store.check(&registered_action_names());

    for warning in &report.warnings {
        ui::hint(&format!("warning: {}", warning));
    }
    for error in &report.errors {
        ui::failure(error);
    }

    if !report.is_ok() {
        return Err(anyhow!(SentinelError::ModelStore(format!(
            "{} problem(s) found in {}",
            report.errors.len(),
            dir.display()
        ))));
    }

    ui::success(&format!(
        "Model store at {} is consistent ({} intents, {} responses, {} actions)",
        dir.display(),
        store.intents.len(),
        store.responses.len(),
        store.actions.len()
    ));
    Ok(())
}
