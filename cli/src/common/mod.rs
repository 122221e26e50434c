//! # CogniSentinel Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared utilities used by more than one command, kept apart from the
//! command-specific logic in `commands::` and the infrastructure in `core::`.
//!
//! - **`emotion`**: emotion categories and taggers (remote service with keyword fallback).
//! - **`network`**: listener binding, port checks, the outbound HTTP client, shutdown signals.
//! - **`process`**: spawning and supervising child processes for the launcher.
//! - **`ui`**: coloured operator-facing status lines.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::{emotion, network, process, ui};
//!
//! let listener = network::bind_listener("Action server", addr).await?;
//! ui::success("Action server started on port 5055");
//! ```
//!

/// Emotion categories and the taggers that produce them.
pub mod emotion;
/// Listener binding, port probing, HTTP client and shutdown handling.
pub mod network;
/// Child process spawning and liveness checks.
pub mod process;
/// Coloured terminal status output.
pub mod ui;
