//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and loading (TOML or JSON)
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup checks returning every problem found

mod defaults;
mod types;
pub mod validation;

pub use types::{
    Config, ConfigError, HistoryConfig, IdentityConfig, LogConfig, LogFormat, PluginConfig,
    PluginsConfig, ServerConfig,
};
pub use validation::{ValidationError, validate};
