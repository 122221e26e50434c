//! # CogniSentinel CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Every command is
//! run inside a throwaway project directory so neither the developer's own
//! `cognisentinel.toml` nor their user configuration leaks into a test.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// # Get CogniSentinel Command (`sentinel_cmd`)
///
/// An `assert_cmd::Command` for the compiled `cognisentinel` binary.
///
/// ## Panics
/// Panics if the binary cannot be found via `Command::cargo_bin`.
pub fn sentinel_cmd() -> Command {
    Command::cargo_bin("cognisentinel").expect("Failed to find cognisentinel binary for testing")
}

/// `sentinel_cmd` running in `dir`, with user configuration and colours disabled.
pub fn sentinel_cmd_in(dir: &Path) -> Command {
    let mut cmd = sentinel_cmd();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("COGNISENTINEL_CONFIG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

/// A project directory with a `.git` marker so the config search stops there.
pub fn project_dir(config: Option<&str>) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp project dir");
    fs::create_dir(dir.path().join(".git")).expect("Failed to create .git marker");
    if let Some(content) = config {
        fs::write(dir.path().join("cognisentinel.toml"), content)
            .expect("Failed to write cognisentinel.toml");
    }
    dir
}

/// A loopback address nothing is listening on right now.
pub fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind ephemeral port");
    listener.local_addr().expect("Failed to read local address")
}

/// Project configuration placing every component on the given loopback ports.
pub fn config_with_ports(relay: u16, actions: u16, engine: u16, engine_command: &str) -> String {
    config_with_engine(relay, actions, engine, engine_command, &[])
}

/// Like `config_with_ports`, with arguments for the engine command. `{port}`
/// in an argument becomes the engine port.
pub fn config_with_engine(
    relay: u16,
    actions: u16,
    engine: u16,
    engine_command: &str,
    engine_args: &[&str],
) -> String {
    let engine_args = engine_args
        .iter()
        .map(|arg| format!("{:?}", arg))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
[relay]
port = {relay}
engine_url = "http://127.0.0.1:{engine}"

[actions]
port = {actions}
engine_url = "http://127.0.0.1:{engine}"

[engine]
port = {engine}
command = "{engine_command}"
args = [{engine_args}]
model_dir = "."
startup_timeout_secs = 5

[launcher]
startup_timeout_secs = 20
poll_interval_ms = 100
"#
    )
}

/// Starts `cognisentinel launch` in `dir` without waiting for it, with the
/// same isolation as `sentinel_cmd_in`. Stdout is piped for `stdout_lines`.
pub fn spawn_launch(dir: &Path) -> Child {
    std::process::Command::new(assert_cmd::cargo::cargo_bin("cognisentinel"))
        .arg("launch")
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("COGNISENTINEL_CONFIG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("Failed to spawn cognisentinel launch")
}

/// Forwards the child's stdout line by line over a channel.
pub fn stdout_lines(child: &mut Child) -> Receiver<String> {
    let stdout = child.stdout.take().expect("stdout must be piped");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Collects lines until one contains `needle`. Panics after `timeout`.
pub fn read_until(lines: &Receiver<String>, needle: &str, timeout: Duration) -> Vec<String> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match lines.recv_timeout(remaining) {
            Ok(line) => {
                let found = line.contains(needle);
                seen.push(line);
                if found {
                    return seen;
                }
            }
            Err(_) => panic!("'{}' not printed in time; got {:?}", needle, seen),
        }
    }
}

/// Waits for the child to exit. Kills it and panics after `timeout`.
pub fn wait_for_exit(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().expect("Failed to poll child") {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("process did not exit within {:?}", timeout);
        }
        thread::sleep(Duration::from_millis(100));
    }
}

/// Panics if anything still listens on one of `addrs`.
pub fn assert_ports_free(addrs: &[SocketAddr]) {
    for addr in addrs {
        assert!(
            TcpListener::bind(addr).is_ok(),
            "port {} is still in use",
            addr.port()
        );
    }
}
