//! # CogniSentinel Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout CogniSentinel. It pairs
//! a `thiserror` enum for the failures that callers need to recognise (a port
//! already taken, a child process that never came up, an upstream service that
//! could not be reached) with an `anyhow`-based `Result` alias for everything
//! that only needs to be reported.
//!
//! ## Architecture
//!
//! - `SentinelError`: domain-specific failures, matched on by the relay, the
//!   action handlers and the launcher.
//! - `Result<T>`: `anyhow::Result<T>`, used by command handlers so context can
//!   be attached with `.context(...)` on the way up to `main`.
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error type
//! return Err(SentinelError::PortInUse { process: "Web relay".into(), port: 8000 })?;
//!
//! // Recognise it further up
//! if let Some(SentinelError::PortInUse { process, .. }) = err.downcast_ref::<SentinelError>() {
//!     eprintln!("{process} is blocked");
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for CogniSentinel.
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{process} could not bind port {port}: address already in use")]
    PortInUse { process: String, port: u16 },

    #[error("{process} failed to start: {reason}")]
    ProcessStart { process: String, reason: String },

    #[error("{process} exited unexpectedly ({status})")]
    ProcessExited { process: String, status: String },

    #[error("{service} is unreachable: {reason}")]
    Upstream { service: String, reason: String },

    #[error("{service} answered with HTTP {status}")]
    UpstreamStatus { service: String, status: u16 },

    #[error("{service} returned an unusable reply: {reason}")]
    UpstreamReply { service: String, reason: String },

    #[error("{service} is not configured with an API key")]
    MissingApiKey { service: String },

    #[error("Model store error: {0}")]
    ModelStore(String),
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
