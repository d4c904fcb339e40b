//! Mock IRC server.
//!
//! Binds an ephemeral port on localhost and hands out accepted connections.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;

use super::peer::ServerPeer;

/// How long tests wait for the client to show up.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(5);

/// A listening mock server.
pub struct MockServer {
    listener: TcpListener,
    port: u16,
}

impl MockServer {
    /// Bind on `127.0.0.1` with an OS-assigned port.
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn address(&self) -> &'static str {
        "127.0.0.1"
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept the next client connection.
    pub async fn accept(&self) -> anyhow::Result<ServerPeer> {
        let (stream, _) = timeout(ACCEPT_TIMEOUT, self.listener.accept()).await??;
        Ok(ServerPeer::new(stream))
    }
}

/// A localhost port nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    Ok(listener.local_addr()?.port())
}
