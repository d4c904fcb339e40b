//! Network module.
//!
//! Contains the client [`Connection`]: socket ownership, bounded retry and
//! line framing.

mod connection;

pub use connection::{Connection, ConnectionEvent, ConnectionInfo, ConnectionState};
