//! # CogniSentinel Network Utilities (`common::network`)
//!
//! File: cli/src/common/network/mod.rs
//!
//! ## Overview
//!
//! Network helpers shared by the relay, the action server and the launcher:
//!
//! - binding a listener and turning "address in use" into `SentinelError::PortInUse`
//! - checking whether a port is free, and whether something is listening on it
//! - the shared outbound HTTP client and the `/status` probe
//! - graceful shutdown on Ctrl+C / SIGTERM
//! - local network IP detection for the startup banner
//!
//! ## Examples
//!
//! ```rust
//! let listener = network::bind_listener("Web relay", addr).await?;
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(network::shutdown_signal())
//!     .await?;
//! ```
//!
use crate::core::error::{Result, SentinelError};
use anyhow::{anyhow, Context};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// How long a single liveness connect attempt may take.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// # Bind Listener (`bind_listener`)
///
/// Binds a `TcpListener` on `addr` for the named process. There is no fallback
/// to another port: the launcher and the browser page both expect the exact
/// configured port.
///
/// ## Errors
///
/// Returns `SentinelError::PortInUse` when the address is taken, and a
/// contextual I/O error for anything else (permissions, bad interface).
pub async fn bind_listener(process: &str, addr: SocketAddr) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("{} bound to {}", process, addr);
            Ok(listener)
        }
        Err(e) if e.kind() == ErrorKind::AddrInUse => Err(anyhow!(SentinelError::PortInUse {
            process: process.to_string(),
            port: addr.port(),
        })),
        Err(e) => Err(e).with_context(|| format!("{} failed to bind {}", process, addr)),
    }
}

/// Returns `true` if a listener could be bound on `addr` right now.
pub async fn port_available(addr: SocketAddr) -> bool {
    match TcpListener::bind(addr).await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) => {
            debug!("Port {} on {} is unavailable: {}", addr.port(), addr.ip(), e);
            false
        }
    }
}

/// Address to dial for a server bound on `addr`: wildcard hosts become loopback.
pub fn connect_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}

/// Returns `true` if a TCP connection to `addr` succeeds within a short timeout.
pub async fn accepts_connections(addr: SocketAddr) -> bool {
    matches!(
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(connect_addr(addr))).await,
        Ok(Ok(_))
    )
}

/// Builds the shared outbound HTTP client. Timeouts are set per request.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("cognisentinel/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Joins a base URL and a path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// # Probe Status Endpoint (`probe_status`)
///
/// Issues `GET url` and reports whether it answered with a 2xx status within
/// `timeout`. Used for the dialogue engine's `/status` endpoint by the relay
/// and by `action_check_server_status`.
pub async fn probe_status(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    match client.get(url).timeout(timeout).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("Status probe {} answered {}", url, response.status());
            true
        }
        Ok(response) => {
            warn!("Status probe {} answered {}", url, response.status());
            false
        }
        Err(e) => {
            warn!("Status probe {} failed: {}", url, e);
            false
        }
    }
}

/// # Handle Shutdown Signal (`shutdown_signal`)
///
/// Resolves when Ctrl+C or (on Unix) SIGTERM is received. Passed to
/// `axum::serve(...).with_graceful_shutdown` and awaited by the launcher.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                error!(
                    "Failed to install SIGTERM handler: {}. Shutdown on SIGTERM might not work.",
                    e
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// # Get Local IP Address (`get_local_ip`)
///
/// Finds a non-loopback address for the "Network URL" line of the relay
/// banner by trying a few platform commands. Falls back to `"localhost"`.
/// The commands run on tokio's process driver so the runtime is never blocked.
pub async fn get_local_ip() -> String {
    let commands = [
        "ipconfig getifaddr en0",
        "ipconfig getifaddr en1",
        "ip addr show | grep 'inet ' | grep -v '127.0.0.1' | head -n 1 | awk '{print $2}' | cut -d/ -f1",
        "ifconfig | grep 'inet ' | grep -v '127.0.0.1' | head -n 1 | awk '{print $2}'",
    ];

    for cmd_str in commands {
        match tokio::process::Command::new("sh")
            .arg("-c")
            .arg(cmd_str)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                let ip = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !ip.is_empty() && ip != "localhost" {
                    debug!("Found local IP: {}", ip);
                    return ip;
                }
            }
            Ok(_) => debug!("Command '{}' produced no address", cmd_str),
            Err(e) => debug!("Error executing command '{}': {}", cmd_str, e),
        }
    }

    debug!("Could not detect local network IP, falling back to 'localhost'");
    "localhost".to_string()
}
