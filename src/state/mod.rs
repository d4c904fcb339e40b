//! State management module.
//!
//! Contains the [`Session`] (connection + channel roster) and its
//! [`Channel`] entries.

mod channel;
mod session;

pub use channel::Channel;
pub use session::{Session, SessionState};
