//! # CogniSentinel Web Relay
//!
//! File: cli/src/commands/relay/mod.rs
//!
//! ## Overview
//!
//! `cognisentinel relay` serves the chat page and forwards each message the
//! page POSTs to the dialogue engine's REST channel, handing the engine's
//! reply back to the browser.
//!
//! ## Architecture
//!
//! - `upstream.rs`: the dialogue engine client and the relay's wire types
//! - `server_logic.rs`: the Axum router, handlers and server loop
//!
//! ## Examples
//!
//! ```bash
//! cognisentinel relay
//! cognisentinel relay --port 9000 --host 0.0.0.0 --static-dir ./site
//! ```
//!
use crate::core::config::{self, Config};
use crate::core::error::Result;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{debug, info};

pub mod server_logic;
pub mod upstream;

/// # Relay Arguments (`RelayArgs`)
///
/// Flags override the `[relay]` section of the configuration.
#[derive(Parser, Debug, Default)]
pub struct RelayArgs {
    /// Interface to bind to. Use `0.0.0.0` to accept connections from the network.
    #[arg(long)]
    pub host: Option<IpAddr>,

    #[arg(long, short)]
    pub port: Option<u16>,

    /// Directory holding `index.html` and the page's assets.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Base URL of the dialogue engine's REST API.
    #[arg(long)]
    pub engine_url: Option<String>,

    /// Do not send CORS headers.
    #[arg(long)]
    pub no_cors: bool,
}

impl RelayArgs {
    fn apply_to(self, config: &mut Config) {
        let relay = &mut config.relay;
        if let Some(host) = self.host {
            relay.host = host;
        }
        if let Some(port) = self.port {
            relay.port = port;
        }
        if let Some(dir) = self.static_dir {
            relay.static_dir = dir;
        }
        if let Some(url) = self.engine_url {
            relay.engine_url = url;
        }
        if self.no_cors {
            relay.enable_cors = false;
        }
    }
}

/// # Handle Relay Command (`handle_relay`)
///
/// Applies the CLI overrides, re-validates and runs the relay until shutdown.
pub async fn handle_relay(args: RelayArgs, mut config: Config) -> Result<()> {
    debug!("Handling relay command with args: {:?}", args);
    args.apply_to(&mut config);
    config::validate_config(&config)?;
    info!("Effective relay config: {:?}", config.relay);

    server_logic::run_server(&config.relay).await
}
