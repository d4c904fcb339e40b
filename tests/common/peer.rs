//! Server side of one client connection.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads what the client sends and writes server lines back.
pub struct ServerPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl ServerPeer {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Send one line, appending `\r\n`.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one line with the terminator removed.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(RECV_TIMEOUT).await
    }

    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("client closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive lines until one equals `expected`, returning everything read.
    #[allow(dead_code)]
    pub async fn recv_until(&mut self, expected: &str) -> anyhow::Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.recv_line().await?;
            let done = line == expected;
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Assert the client registered as `nickname`: USER followed by NICK.
    #[allow(dead_code)]
    pub async fn expect_registration(&mut self, nickname: &str) -> anyhow::Result<()> {
        let user = self.recv_line().await?;
        anyhow::ensure!(user.starts_with(&format!("USER {nickname} ")), "expected USER, got {user:?}");
        let nick = self.recv_line().await?;
        anyhow::ensure!(nick == format!("NICK {nickname}"), "expected NICK, got {nick:?}");
        Ok(())
    }

    /// Assert nothing arrives within `dur`.
    #[allow(dead_code)]
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_timeout(dur).await {
            Ok(line) => anyhow::bail!("expected silence, got {line:?}"),
            Err(_) => Ok(()),
        }
    }
}
