//! Persisted configuration for the vpngui client.
//!
//! One TOML file with two tables: `[settings]` (what the Settings page
//! edits) and `[state]` (session flags the engine persists between runs).
//! [`FileStore`] serves both to `vpngui-core` through its `ConfigStore`
//! and `SettingsStore` collaborator traits. [`logging`] installs the
//! tracing subscriber from the persisted log level.

pub mod logging;
mod store;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;

pub use store::FileStore;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to install tracing subscriber: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub state: SessionFlags,
}

/// How traffic is steered into the tunnel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportMode {
    #[default]
    SystemProxy,
    Tun,
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_theme")]
    pub theme: String,

    /// Launch with the operating system session.
    #[serde(default)]
    pub autostart: bool,

    /// Start minimized when launched by autostart.
    #[serde(default)]
    pub hide_on_autostart: bool,

    #[serde(default)]
    pub transport_mode: TransportMode,

    /// One of trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Telemetry poll cadence in whole seconds.
    #[serde(default = "default_stats_update_interval")]
    pub stats_update_interval: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: default_language(),
            theme: default_theme(),
            autostart: false,
            hide_on_autostart: false,
            transport_mode: TransportMode::default(),
            log_level: default_log_level(),
            stats_update_interval: default_stats_update_interval(),
        }
    }
}

fn default_language() -> String {
    "ru".into()
}
fn default_theme() -> String {
    "dark".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_stats_update_interval() -> i64 {
    1
}

/// Flags persisted by the engine and read back at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionFlags {
    /// The tunnel was running when the client last exited.
    #[serde(default)]
    pub active_vpn: bool,

    /// Routing rules are bypassed.
    #[serde(default)]
    pub disable_routes: bool,

    /// `true` enforces the blacklist, `false` the whitelist.
    #[serde(default = "default_blacklist_enforced")]
    pub blacklist_enforced: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            active_vpn: false,
            disable_routes: false,
            blacklist_enforced: default_blacklist_enforced(),
        }
    }
}

fn default_blacklist_enforced() -> bool {
    true
}

impl Config {
    /// Reject values that would be written but never usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.stats_update_interval <= 0 {
            return Err(ConfigError::Validation {
                field: "settings.stats_update_interval".into(),
                reason: format!(
                    "must be at least 1 second, got {}",
                    self.settings.stats_update_interval
                ),
            });
        }
        if logging::canonical_level(&self.settings.log_level).is_none() {
            return Err(ConfigError::Validation {
                field: "settings.log_level".into(),
                reason: format!(
                    "expected trace, debug, info, warn or error, got '{}'",
                    self.settings.log_level
                ),
            });
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vpngui", "vpngui").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default log file location, next to other per-user data.
pub fn log_path() -> PathBuf {
    ProjectDirs::from("com", "vpngui", "vpngui").map_or_else(
        || dirs_fallback().join("vpngui.log"),
        |dirs| dirs.data_local_dir().join("vpngui.log"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vpngui");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file, then `VPNGUI_`
/// environment variables (`VPNGUI_SETTINGS__LOG_LEVEL=debug`).
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VPNGUI_").split("__"))
}

/// Load the Config at `path`. A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Validate, serialize to TOML and write to `path`.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}
