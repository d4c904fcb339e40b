//! Integration test common infrastructure.
//!
//! Provides an in-process mock IRC server and the server side of each
//! accepted connection, for asserting on the lines the client sends.

pub mod peer;
pub mod server;

#[allow(unused_imports)]
pub use peer::ServerPeer;
#[allow(unused_imports)]
pub use server::{MockServer, closed_port};
