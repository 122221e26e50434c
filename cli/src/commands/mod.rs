//! # CogniSentinel Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! One module per subcommand of the `cognisentinel` binary. Each defines its
//! clap `*Args` struct and a `handle_*` entry point called from `main.rs`
//! with the already-loaded configuration.
//!
//! ## Commands
//!
//! - `relay`: web relay between the chat page and the dialogue engine
//! - `actions`: custom action server the dialogue engine calls back into
//! - `launch`: starts the action server, the engine and the relay together
//! - `check`: validates the conversation model store
//!

/// Custom action server (`cognisentinel actions`).
pub mod actions;
/// Model store validation (`cognisentinel check`).
pub mod check;
/// Process launcher (`cognisentinel launch`).
pub mod launch;
/// Web relay (`cognisentinel relay`).
pub mod relay;
