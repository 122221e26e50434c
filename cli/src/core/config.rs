//! # CogniSentinel Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module loads, merges and validates the configuration shared by the web
//! relay, the custom action server, the launcher and the model store checker.
//!
//! ## Architecture
//!
//! Configuration sources, lowest precedence first:
//! 1. Default values defined in this file
//! 2. User-specific `<config dir>/cognisentinel/config.toml`
//! 3. Project `cognisentinel.toml` in the current directory or an ancestor
//!    (the search stops at a directory containing `.git`), or the file named
//!    by `--config`
//! 4. Command-line flags, applied by each command on top of the loaded config
//!
//! Files are merged table-by-table before deserialization, so a project file
//! only needs the keys it wants to change. After `~` expansion, a relative
//! directory is resolved against the directory of the file that set it.
//! Built-in defaults resolve against the project file's directory (or the
//! current directory when there is none).
//!
//! ## Examples
//!
//! ```toml
//! [relay]
//! port = 8000
//! static_dir = "web"
//! engine_url = "http://localhost:5005"
//!
//! [actions]
//! port = 5055
//! tagger_url = "http://localhost:5100/tag"
//!
//! [engine]
//! port = 5005
//! model_dir = "bot"
//! ```
//!
use crate::core::error::{Result, SentinelError};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use tracing::{debug, info, warn};

/// Name of the project configuration file searched for from the current directory upwards.
pub const PROJECT_CONFIG_FILENAME: &str = "cognisentinel.toml";

/// Placeholder substituted with the engine port in `engine.args`.
const PORT_PLACEHOLDER: &str = "{port}";

/// `(table, key)` pairs holding directories.
const PATH_KEYS: [(&str, &str); 2] = [("relay", "static_dir"), ("engine", "model_dir")];

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub relay: RelayConfig,
    pub actions: ActionsConfig,
    pub engine: EngineConfig,
    pub launcher: LauncherConfig,
}

/// Settings for the web relay (`cognisentinel relay`).
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Directory holding the chat page (`index.html`) and its assets.
    pub static_dir: PathBuf,
    /// Base URL of the dialogue engine's REST API.
    pub engine_url: String,
    pub engine_timeout_secs: u64,
    /// Upper bound on requests handled at the same time.
    pub max_in_flight: usize,
    pub enable_cors: bool,
}

/// Settings for the custom action server (`cognisentinel actions`).
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ActionsConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Dialogue engine base URL, probed by `action_check_server_status`.
    pub engine_url: String,
    /// Emotion tagging service. Keyword tagging is used when unset.
    pub tagger_url: Option<String>,
    /// Quote service returning `{"quote", "author"}`. Built-in quotes are used when unset.
    pub quote_url: Option<String>,
    /// OpenAI-compatible chat completions endpoint.
    pub llm_url: String,
    pub llm_model: String,
    /// Usually supplied through `OPENAI_API_KEY` rather than a file.
    pub llm_api_key: Option<String>,
    /// Intent confidence below which `action_process_message` answers on its own.
    pub low_confidence_threshold: f64,
    pub max_in_flight: usize,
}

/// How the launcher starts the external dialogue engine.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Address used to check that the engine port is free and, later, listening.
    pub host: IpAddr,
    pub port: u16,
    pub command: String,
    /// Arguments passed to `command`; `{port}` is replaced by `port`.
    pub args: Vec<String>,
    /// Conversation model store, also the engine's working directory.
    pub model_dir: PathBuf,
    pub startup_timeout_secs: u64,
}

/// Launcher timings for the processes it starts from this binary.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherConfig {
    pub startup_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            static_dir: PathBuf::from("web"),
            engine_url: "http://localhost:5005".to_string(),
            engine_timeout_secs: 10,
            max_in_flight: 64,
            enable_cors: true,
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5055,
            engine_url: "http://localhost:5005".to_string(),
            tagger_url: None,
            quote_url: None,
            llm_url: "https://api.openai.com/v1/chat/completions".to_string(),
            llm_model: "gpt-3.5-turbo".to_string(),
            llm_api_key: None,
            low_confidence_threshold: 0.3,
            max_in_flight: 64,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5005,
            command: "rasa".to_string(),
            args: [
                "run",
                "--enable-api",
                "--cors",
                "*",
                "--port",
                PORT_PLACEHOLDER,
                "--endpoints",
                "endpoints.yml",
                "--credentials",
                "credentials.yml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            model_dir: PathBuf::from("bot"),
            startup_timeout_secs: 60,
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: 15,
            poll_interval_ms: 250,
        }
    }
}

impl RelayConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }
}

impl ActionsConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EngineConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Engine arguments with the port placeholder filled in.
    pub fn expanded_args(&self) -> Vec<String> {
        let port = self.port.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(PORT_PLACEHOLDER, &port))
            .collect()
    }
}

/// # Load Configuration (`load_config`)
///
/// Loads the effective configuration for a command run from the current
/// directory. `explicit` is the `--config` file, which replaces the project
/// file search when given.
///
/// ## Errors
///
/// Fails when a configuration file cannot be read or parsed, contains unknown
/// keys, or describes an invalid setup (see `validate_config`).
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    load_config_from(&current_dir, user_config_path().as_deref(), explicit)
}

/// Same as `load_config`, starting the project file search at `start_dir` and
/// reading the user layer from `user_file` (skipped when absent or missing).
pub fn load_config_from(
    start_dir: &Path,
    user_file: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<Config> {
    let mut merged = toml::Table::new();

    match user_file {
        Some(path) if path.is_file() => {
            info!("Loading user configuration from: {}", path.display());
            merge_tables(&mut merged, read_layer(path, start_dir)?);
        }
        Some(path) => debug!("User configuration file not found at {}", path.display()),
        None => {}
    }

    let project_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_project_config_path(start_dir),
    };
    let base_dir = match &project_path {
        Some(path) => {
            info!("Loading project configuration from: {}", path.display());
            merge_tables(&mut merged, read_layer(path, start_dir)?);
            file_dir(path, start_dir)
        }
        None => {
            debug!(
                "No {} found in {} or its ancestors.",
                PROJECT_CONFIG_FILENAME,
                start_dir.display()
            );
            start_dir.to_path_buf()
        }
    };

    let mut config: Config = toml::Value::Table(merged)
        .try_into()
        .context("Failed to interpret configuration")?;
    resolve_config_paths(&mut config, &base_dir);
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

/// `<config dir>/cognisentinel/config.toml`, if the platform has a config dir.
fn user_config_path() -> Option<PathBuf> {
    let Some(proj_dirs) = ProjectDirs::from("com", "CogniSentinel", "cognisentinel") else {
        warn!("Could not determine user config directory.");
        return None;
    };
    Some(proj_dirs.config_dir().join("config.toml"))
}

/// Absolute directory holding `path`.
fn file_dir(path: &Path, start_dir: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| resolve_path(parent, start_dir))
        .unwrap_or_else(|| start_dir.to_path_buf())
}

/// Reads one configuration file with its directories already anchored to the
/// file's own location.
fn read_layer(path: &Path, start_dir: &Path) -> Result<toml::Table> {
    let mut table = read_table(path)?;
    anchor_relative_paths(&mut table, &file_dir(path, start_dir));
    Ok(table)
}

fn anchor_relative_paths(table: &mut toml::Table, base_dir: &Path) {
    for (section, key) in PATH_KEYS {
        let Some(toml::Value::Table(section_table)) = table.get_mut(section) else {
            continue;
        };
        if let Some(toml::Value::String(raw)) = section_table.get_mut(key) {
            let resolved = resolve_path(Path::new(raw.as_str()), base_dir);
            *raw = resolved.to_string_lossy().into_owned();
        }
    }
}

fn find_project_config_path(start_dir: &Path) -> Option<PathBuf> {
    let mut path = start_dir;
    loop {
        let candidate = path.join(PROJECT_CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Overlays `overlay` onto `base`. Nested tables merge key by key; any other
/// value replaces what was there.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

fn resolve_config_paths(config: &mut Config, base_dir: &Path) {
    config.relay.static_dir = resolve_path(&config.relay.static_dir, base_dir);
    config.engine.model_dir = resolve_path(&config.engine.model_dir, base_dir);
    debug!(
        "Resolved static_dir={} model_dir={}",
        config.relay.static_dir.display(),
        config.engine.model_dir.display()
    );
}

/// Expands `~` and makes `path` absolute relative to `base_dir`.
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// # Validate Configuration (`validate_config`)
///
/// Rejects setups that cannot work: zero or clashing ports, an empty engine
/// command, a threshold outside `[0, 1]`, a zero request limit, and URLs that
/// are not `http(s)`. A missing static directory is only a warning here since
/// most commands never read it; the relay checks it before serving.
pub fn validate_config(config: &Config) -> Result<()> {
    let ports = [
        ("relay.port", config.relay.port),
        ("actions.port", config.actions.port),
        ("engine.port", config.engine.port),
    ];
    for (i, (name, port)) in ports.iter().enumerate() {
        if *port == 0 {
            return Err(anyhow!(SentinelError::Config(format!(
                "{} must not be 0",
                name
            ))));
        }
        if let Some((other, _)) = ports[..i].iter().find(|(_, p)| p == port) {
            return Err(anyhow!(SentinelError::Config(format!(
                "{} and {} are both set to {}",
                other, name, port
            ))));
        }
    }

    if config.engine.command.trim().is_empty() {
        return Err(anyhow!(SentinelError::Config(
            "engine.command must not be empty".to_string()
        )));
    }

    let threshold = config.actions.low_confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(anyhow!(SentinelError::Config(format!(
            "actions.low_confidence_threshold must be within [0, 1], got {}",
            threshold
        ))));
    }

    if config.relay.max_in_flight == 0 || config.actions.max_in_flight == 0 {
        return Err(anyhow!(SentinelError::Config(
            "max_in_flight must be at least 1".to_string()
        )));
    }

    let urls = [
        ("relay.engine_url", Some(&config.relay.engine_url)),
        ("actions.engine_url", Some(&config.actions.engine_url)),
        ("actions.llm_url", Some(&config.actions.llm_url)),
        ("actions.tagger_url", config.actions.tagger_url.as_ref()),
        ("actions.quote_url", config.actions.quote_url.as_ref()),
    ];
    for (name, url) in urls {
        if let Some(url) = url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!(SentinelError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                ))));
            }
        }
    }

    if !config.relay.static_dir.is_dir() {
        warn!(
            "Configured static directory '{}' does not exist.",
            config.relay.static_dir.display()
        );
    }
    Ok(())
}
