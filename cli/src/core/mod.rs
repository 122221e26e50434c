//! # CogniSentinel Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure shared by every command:
//!
//! - `config`: layered configuration loading, merging and validation
//! - `error`: the `SentinelError` enum and the crate-wide `Result` alias
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config::{self, Config};
//! use crate::core::error::{Result, SentinelError};
//! ```
//!
pub mod config;
pub mod error;
