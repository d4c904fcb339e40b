//! Unified error handling for slircbot.
//!
//! One error enum per layer, converted upwards with `#[from]`. Only
//! construction-time problems (bad retry count, invalid configuration)
//! surface to the binary; runtime failures are logged and isolated where
//! they happen.

use slirc_proto::ProtocolError;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::history::HistoryError;
use crate::plugin::PluginAction;

// ============================================================================
// Connection Errors (socket + retry)
// ============================================================================

/// Errors raised by [`Connection`](crate::network::Connection).
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("max_retries must be at least 1")]
    InvalidRetryCount,

    #[error("not connected")]
    NotConnected,

    #[error("could not connect to {address}:{port} after {attempts} attempts")]
    RetriesExhausted {
        address: String,
        port: u16,
        attempts: u32,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ConnectionError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRetryCount => "invalid_retry_count",
            Self::NotConnected => "not_connected",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
        }
    }
}

// ============================================================================
// Session Errors (registration + roster)
// ============================================================================

/// Errors raised by [`Session`](crate::state::Session).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
}

// ============================================================================
// Plugin + Handler Errors
// ============================================================================

/// Errors returned by plugin lifecycle hooks.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {plugin} failed to start: {reason}")]
    Start { plugin: String, reason: String },

    #[error("plugin {plugin} failed to stop: {reason}")]
    Stop { plugin: String, reason: String },

    #[error("invalid composition {id}: {reason}")]
    InvalidComposition { id: String, reason: String },

    #[error("plugin discovery failed: {0}")]
    Discovery(String),
}

/// Errors returned by composition handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("host callback closed: {0}")]
    Callback(#[from] mpsc::error::SendError<PluginAction>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::Callback(_) => "callback_closed",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type for composition handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Client Errors (top level)
// ============================================================================

/// Errors raised by [`Client`](crate::client::Client).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
