//! # CogniSentinel Terminal Output (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! Coloured status lines for the launcher: a bold banner, "starting" steps,
//! ✓ successes, ✗ failures and hints. Logging stays on `tracing`; these lines
//! are the operator-facing echo printed regardless of verbosity.
//!
use colored::Colorize;

/// Bold blue heading.
pub fn banner(message: &str) {
    println!("{}", message.blue().bold());
}

/// A step that is about to happen ("Starting Web relay...").
pub fn step(message: &str) {
    println!("{}", message.blue());
}

pub fn success(message: &str) {
    println!("{}", format!("✓ {}", message).green());
}

/// Printed to stderr so it survives stdout redirection.
pub fn failure(message: &str) {
    eprintln!("{}", format!("✗ {}", message).red());
}

pub fn hint(message: &str) {
    println!("{}", message.yellow());
}
