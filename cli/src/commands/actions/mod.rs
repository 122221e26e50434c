//! # CogniSentinel Custom Action Server
//!
//! File: cli/src/commands/actions/mod.rs
//!
//! ## Overview
//!
//! `cognisentinel actions` runs the server the dialogue engine calls back into
//! whenever a story or rule reaches a custom action. The actions tag the
//! user's latest message with an emotion, pick supportive replies and coping
//! techniques, fetch quotes, probe the engine and, as a last resort, ask a
//! language model.
//!
//! ## Architecture
//!
//! - `protocol.rs`: wire types of the action-callback protocol
//! - `catalog.rs`: canned replies, techniques and quotes
//! - `llm.rs`: OpenAI-compatible chat-completion client
//! - `handlers.rs`: the `CustomAction` implementations and their registry
//! - `server_logic.rs`: the Axum server
//!
//! ## Examples
//!
//! ```bash
//! # Defaults from cognisentinel.toml (port 5055)
//! cognisentinel actions
//!
//! # Use a remote emotion tagger and a language-model key from the environment
//! OPENAI_API_KEY=sk-... cognisentinel actions --tagger-url http://localhost:8500/tag
//! ```
//!
use crate::core::config::{self, Config};
use crate::core::error::Result;
use clap::Parser;
use std::net::IpAddr;
use tracing::{debug, info};

pub mod catalog;
pub mod handlers;
pub mod llm;
pub mod protocol;
pub mod server_logic;

/// # Action Server Arguments (`ActionsArgs`)
///
/// Flags override the `[actions]` section of the configuration.
#[derive(Parser, Debug, Default)]
pub struct ActionsArgs {
    /// Interface to bind to.
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on (the engine's endpoints file must match).
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Base URL of the dialogue engine, used by the status check action.
    #[arg(long)]
    pub engine_url: Option<String>,

    /// Emotion tagging service. Without one, keywords are used.
    #[arg(long)]
    pub tagger_url: Option<String>,

    /// Quote service returning `{"quote", "author"}`.
    #[arg(long)]
    pub quote_url: Option<String>,

    /// API key for the language-model fallback.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
}

impl ActionsArgs {
    fn apply_to(self, config: &mut Config) {
        let actions = &mut config.actions;
        if let Some(host) = self.host {
            actions.host = host;
        }
        if let Some(port) = self.port {
            actions.port = port;
        }
        if let Some(url) = self.engine_url {
            actions.engine_url = url;
        }
        if let Some(url) = self.tagger_url {
            actions.tagger_url = Some(url);
        }
        if let Some(url) = self.quote_url {
            actions.quote_url = Some(url);
        }
        if let Some(key) = self.llm_api_key {
            actions.llm_api_key = Some(key);
        }
    }
}

/// # Handle Actions Command (`handle_actions`)
///
/// Applies the CLI overrides, re-validates and runs the action server until
/// shutdown.
pub async fn handle_actions(args: ActionsArgs, mut config: Config) -> Result<()> {
    debug!("Handling actions command with args: {:?}", args);
    args.apply_to(&mut config);
    config::validate_config(&config)?;
    info!(
        "Starting action server on {} (engine {})",
        config.actions.socket_addr(),
        config.actions.engine_url
    );

    server_logic::run_server(&config.actions).await
}
