//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

pub fn default_max_retries() -> u32 {
    3
}

// =============================================================================
// Plugin / History / Log Defaults
// =============================================================================

pub fn default_plugin_directory() -> String {
    "plugins".to_string()
}

pub fn default_history_capacity() -> usize {
    10_000
}

pub fn default_log_filter() -> String {
    "info".to_string()
}
