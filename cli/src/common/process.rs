//! # CogniSentinel Process Management (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! Starts and supervises the long-running child processes used by
//! `cognisentinel launch`: the dialogue engine, the action server and the web
//! relay. Each child inherits the launcher's stdout/stderr so its logs stay
//! visible, and is killed when its handle is dropped.
//!
//! ## Architecture
//!
//! - `ProcessSpec`: what to run, where, and which address it must listen on.
//! - `ManagedProcess`: a running child plus the liveness checks the launcher
//!   needs (`wait_until_listening`, `try_wait`, `terminate`).
//!
//! ## Examples
//!
//! ```rust
//! let mut relay = ManagedProcess::spawn(&spec)?;
//! relay.wait_until_listening(Duration::from_millis(250)).await?;
//! // ...
//! relay.terminate().await;
//! ```
//!
use crate::common::network;
use crate::core::error::{Result, SentinelError};
use anyhow::anyhow;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How long a child gets to exit after SIGTERM before it is killed.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Description of a child process to start.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Human-readable name used in every message ("Web relay").
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Address the child is expected to listen on once it is up.
    pub addr: SocketAddr,
    pub startup_timeout: Duration,
}

impl ProcessSpec {
    /// The command line as one string, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A started child process.
#[derive(Debug)]
pub struct ManagedProcess {
    spec: ProcessSpec,
    child: Child,
}

impl ManagedProcess {
    /// # Spawn Process (`spawn`)
    ///
    /// Starts the process described by `spec`. Stdin is closed; stdout and
    /// stderr are inherited.
    ///
    /// ## Errors
    ///
    /// `SentinelError::ProcessStart` when the program cannot be executed (not
    /// installed, not executable, bad working directory).
    pub fn spawn(spec: &ProcessSpec) -> Result<Self> {
        info!("Starting {}: {}", spec.name, spec.command_line());

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let child = command.spawn().map_err(|e| {
            anyhow!(SentinelError::ProcessStart {
                process: spec.name.clone(),
                reason: format!("could not run '{}': {}", spec.program.display(), e),
            })
        })?;
        debug!("{} started with pid {:?}", spec.name, child.id());

        Ok(Self {
            spec: spec.clone(),
            child,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn port(&self) -> u16 {
        self.spec.addr.port()
    }

    /// # Wait Until Listening (`wait_until_listening`)
    ///
    /// Polls the child's address every `poll_interval` until it accepts TCP
    /// connections.
    ///
    /// ## Errors
    ///
    /// - `SentinelError::ProcessExited` if the child exits first (typically
    ///   because it could not bind its port).
    /// - `SentinelError::ProcessStart` if nothing listens within the spec's
    ///   startup timeout.
    pub async fn wait_until_listening(&mut self, poll_interval: Duration) -> Result<()> {
        let deadline = Instant::now() + self.spec.startup_timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Err(anyhow!(SentinelError::ProcessExited {
                    process: self.spec.name.clone(),
                    status: status.to_string(),
                }));
            }
            if network::accepts_connections(self.spec.addr).await {
                debug!("{} is accepting connections on {}", self.spec.name, self.spec.addr);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(anyhow!(SentinelError::ProcessStart {
                    process: self.spec.name.clone(),
                    reason: format!(
                        "nothing listening on port {} after {}s",
                        self.spec.addr.port(),
                        self.spec.startup_timeout.as_secs()
                    ),
                }));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Exit status if the child has already exited; never blocks.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// # Terminate Process (`terminate`)
    ///
    /// Asks the child to stop (SIGTERM on unix) and waits up to five seconds
    /// for it to exit. A child that is still running after that, or that
    /// cannot be signalled, is killed. Either way it is reaped.
    pub async fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("{} already exited ({})", self.spec.name, status);
                return;
            }
            Ok(None) => {}
            Err(e) => warn!("Could not query {} status: {}", self.spec.name, e),
        }

        if self.request_stop() {
            match tokio::time::timeout(STOP_GRACE, self.child.wait()).await {
                Ok(Ok(status)) => {
                    info!("{} stopped ({})", self.spec.name, status);
                    return;
                }
                Ok(Err(e)) => {
                    warn!("Failed to reap {}: {}", self.spec.name, e);
                    return;
                }
                Err(_) => warn!(
                    "{} did not stop within {}s, killing it",
                    self.spec.name,
                    STOP_GRACE.as_secs()
                ),
            }
        }

        if let Err(e) = self.child.start_kill() {
            warn!("Failed to stop {}: {}", self.spec.name, e);
            return;
        }
        match self.child.wait().await {
            Ok(status) => info!("{} stopped ({})", self.spec.name, status),
            Err(e) => warn!("Failed to reap {}: {}", self.spec.name, e),
        }
    }

    /// Sends SIGTERM. Returns false when no signal could be delivered.
    #[cfg(unix)]
    fn request_stop(&self) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.child.id().and_then(|id| i32::try_from(id).ok()) else {
            return false;
        };
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => {
                debug!("Sent SIGTERM to {} (pid {})", self.spec.name, pid);
                true
            }
            Err(e) => {
                warn!("Could not signal {}: {}", self.spec.name, e);
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&self) -> bool {
        false
    }
}
