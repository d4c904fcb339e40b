//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{
    default_history_capacity, default_log_filter, default_max_retries, default_plugin_directory,
    default_port, default_true,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to parse JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),
}

/// Client configuration.
///
/// Read once at startup and shared immutably (`Arc<Config>`) afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server to connect to.
    pub server: ServerConfig,
    /// Nickname and realname used during registration.
    pub identity: IdentityConfig,
    /// Plugin host settings.
    #[serde(default)]
    pub plugins: PluginsConfig,
    /// In-memory message history.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
    /// Nicknames whose messages are never dispatched to plugins.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Channels joined once the server welcomes us.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Config {
    /// Configuration for `address:port` with every optional setting at its default.
    pub fn new(address: impl Into<String>, port: u16, nickname: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                address: address.into(),
                port,
                max_retries: default_max_retries(),
                retry_delay_ms: 0,
                password: None,
            },
            identity: IdentityConfig {
                nickname: nickname.into(),
                realname: None,
            },
            plugins: PluginsConfig::default(),
            history: HistoryConfig::default(),
            log: LogConfig::default(),
            ignore: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Load configuration from a TOML file, or JSON when the path ends in `.json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: Config = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        Ok(config)
    }

    /// Whether messages from `nickname` should be kept from plugins.
    pub fn is_ignored(&self, nickname: &str) -> bool {
        self.ignore
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(nickname))
    }

    /// The subset of settings handed to plugins on start.
    pub fn plugin_config(&self) -> PluginConfig {
        PluginConfig {
            nickname: self.identity.nickname.clone(),
            realname: self.identity.realname().to_owned(),
            plugin_directory: self.plugins.directory.clone(),
            channels: self.channels.clone(),
        }
    }
}

/// Server connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name or IP address.
    pub address: String,
    /// TCP port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect attempts per (re)connect round (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay between connect attempts in milliseconds (default: 0).
    #[serde(default)]
    pub retry_delay_ms: u64,
    /// Server password, sent as PASS before registering.
    #[serde(default)]
    pub password: Option<String>,
}

/// Registration identity.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub nickname: String,
    /// Defaults to the nickname when omitted.
    #[serde(default)]
    pub realname: Option<String>,
}

impl IdentityConfig {
    /// The realname, falling back to the nickname.
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }
}

/// Plugin host configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginsConfig {
    /// Directory plugins may keep their data in (default: "plugins").
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// Start plugins right after registration (default: true).
    #[serde(default = "default_true")]
    pub autostart: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            autostart: true,
        }
    }
}

/// Message history configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Keep received messages in memory (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum retained messages, 0 for unbounded (default: 10000).
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_history_capacity(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

/// Settings handed to plugins when they start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginConfig {
    pub nickname: String,
    pub realname: String,
    pub plugin_directory: String,
    /// Autojoin channels.
    pub channels: Vec<String>,
}
