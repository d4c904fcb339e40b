//! slircbot - Straylight IRC bot
//!
//! An extensible IRC client: one persistent connection, a channel roster,
//! and a plugin host dispatching server messages to command handlers.

pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod network;
pub mod plugin;
pub mod state;
pub mod telemetry;

pub use client::Client;
pub use config::Config;
pub use error::ClientError;
