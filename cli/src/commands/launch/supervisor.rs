//! # Launch Supervisor
//!
//! File: cli/src/commands/launch/supervisor.rs
//!
//! ## Overview
//!
//! Starts the three servers one after another and keeps them running:
//!
//! 1. Check every configured port is free, in start order. The first one
//!    taken aborts the run before anything is spawned.
//! 2. Spawn the action server, the dialogue engine and the web relay, waiting
//!    for each to accept connections before starting the next.
//! 3. Wait for Ctrl+C / SIGTERM or for any child to exit.
//! 4. Stop every child that is still running.
//!
//! Any failure along the way stops what was already started. The error itself
//! is returned and reported once, by `main`.
//!
use super::ForwardedOptions;
use crate::common::network;
use crate::common::process::{ManagedProcess, ProcessSpec};
use crate::common::ui;
use crate::core::config::Config;
use crate::core::error::{Result, SentinelError};
use anyhow::{anyhow, Context};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const ACTION_SERVER: &str = "Action server";
pub const DIALOGUE_ENGINE: &str = "Dialogue engine";
pub const WEB_RELAY: &str = "Web relay";

/// # Build Process Specs (`process_specs`)
///
/// The action server and relay are this binary re-executed with the `actions`
/// and `relay` subcommands, carrying the global flags along; the engine runs
/// from its configured command line inside the model store.
pub fn process_specs(config: &Config, exe: &Path, forwarded: &ForwardedOptions) -> Vec<ProcessSpec> {
    let own_timeout = Duration::from_secs(config.launcher.startup_timeout_secs);
    let self_command = |subcommand: &str| {
        let mut args = forwarded.global_args();
        args.push(subcommand.to_string());
        args
    };

    vec![
        ProcessSpec {
            name: ACTION_SERVER.to_string(),
            program: exe.to_path_buf(),
            args: self_command("actions"),
            cwd: None,
            addr: config.actions.socket_addr(),
            startup_timeout: own_timeout,
        },
        ProcessSpec {
            name: DIALOGUE_ENGINE.to_string(),
            program: config.engine.command.clone().into(),
            args: config.engine.expanded_args(),
            cwd: Some(config.engine.model_dir.clone()),
            addr: config.engine.socket_addr(),
            startup_timeout: Duration::from_secs(config.engine.startup_timeout_secs),
        },
        ProcessSpec {
            name: WEB_RELAY.to_string(),
            program: exe.to_path_buf(),
            args: self_command("relay"),
            cwd: None,
            addr: config.relay.socket_addr(),
            startup_timeout: own_timeout,
        },
    ]
}

/// Fails with `PortInUse` for the first spec whose port is already taken.
pub async fn preflight(specs: &[ProcessSpec]) -> Result<()> {
    for spec in specs {
        if !network::port_available(spec.addr).await {
            return Err(anyhow!(SentinelError::PortInUse {
                process: spec.name.clone(),
                port: spec.addr.port(),
            }));
        }
        debug!("Port {} is free for {}", spec.addr.port(), spec.name);
    }
    Ok(())
}

/// # Run Launcher (`run`)
///
/// Executes the full launch sequence described in the module docs.
///
/// ## Errors
///
/// - `PortInUse` when a port is taken before launch.
/// - `ProcessStart` / `ProcessExited` when a child cannot be started, never
///   listens, or exits while the stack is running.
pub async fn run(config: &Config, forwarded: &ForwardedOptions) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate the cognisentinel executable")?;
    let specs = process_specs(config, &exe, forwarded);
    let poll_interval = Duration::from_millis(config.launcher.poll_interval_ms);

    ui::banner("Launching CogniSentinel");
    preflight(&specs).await?;

    let mut running: Vec<ManagedProcess> = Vec::with_capacity(specs.len());
    for spec in &specs {
        ui::step(&format!("Starting {}...", spec.name));
        if let Err(e) = start(spec, poll_interval, &mut running).await {
            stop_all(&mut running).await;
            return Err(e);
        }
    }

    ui::banner(&format!(
        "CogniSentinel is running: open http://localhost:{} in your browser",
        config.relay.port
    ));
    ui::hint("Press Ctrl+C to stop all services.");

    let outcome = tokio::select! {
        _ = network::shutdown_signal() => Ok(()),
        (process, status) = first_exit(&mut running, poll_interval) => {
            Err(anyhow!(SentinelError::ProcessExited { process, status }))
        }
    };

    stop_all(&mut running).await;
    outcome
}

async fn start(spec: &ProcessSpec, poll_interval: Duration, running: &mut Vec<ManagedProcess>) -> Result<()> {
    let mut process = ManagedProcess::spawn(spec)?;
    if let Err(e) = process.wait_until_listening(poll_interval).await {
        process.terminate().await;
        return Err(e);
    }
    ui::success(&format!("{} started on port {}", process.name(), process.port()));
    running.push(process);
    Ok(())
}

/// Resolves with the name and status of the first child to exit.
async fn first_exit(running: &mut [ManagedProcess], poll_interval: Duration) -> (String, String) {
    loop {
        for process in running.iter_mut() {
            match process.try_wait() {
                Ok(Some(status)) => return (process.name().to_string(), status.to_string()),
                Ok(None) => {}
                Err(e) => return (process.name().to_string(), e.to_string()),
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Stops children in reverse start order.
async fn stop_all(running: &mut Vec<ManagedProcess>) {
    while let Some(mut process) = running.pop() {
        info!("Stopping {}", process.name());
        process.terminate().await;
    }
}
