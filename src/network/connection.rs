//! Connection - owns the socket to one IRC server.
//!
//! ```text
//!   initialise() ──► connect attempt 1..=max_retries ──► Connected
//!                          │ failure: warn + Disconnected event
//!   listen() ◄── FramedRead<LineCodec> ◄── socket ──► FramedWrite<LineCodec> ◄── send()
//!      │ EOF / missing stream: Logged event + bounded reconnect
//! ```
//!
//! The read and write halves sit behind separate mutexes: concurrent
//! senders are serialized so lines never interleave, and only one `listen`
//! is in flight at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use slirc_proto::LineCodec;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, Notify, broadcast};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::error::ConnectionError;

/// Capacity of the lifecycle event channel.
const EVENT_CAPACITY: usize = 256;

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

/// Details of an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub address: String,
    pub port: u16,
    pub peer_addr: Option<SocketAddr>,
    /// Which attempt of the round succeeded (1-based).
    pub attempt: u32,
}

/// Notifications emitted by a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(ConnectionInfo),
    /// A connect attempt failed, with the reason.
    Disconnected(String),
    /// A line was written and flushed.
    Flushed(String),
    /// Informational lifecycle message.
    Logged(String),
}

/// A single client connection with bounded reconnects.
pub struct Connection {
    address: String,
    port: u16,
    max_retries: u32,
    retry_delay: Duration,
    state: AtomicU8,
    initialised: AtomicBool,
    disposed: AtomicBool,
    /// Incremented on every successful connect.
    generation: AtomicU64,
    reader: Mutex<Option<FramedRead<OwnedReadHalf, LineCodec>>>,
    writer: Mutex<Option<FramedWrite<OwnedWriteHalf, LineCodec>>>,
    closing: Notify,
    events: broadcast::Sender<ConnectionEvent>,
}

impl Connection {
    /// Create a disconnected connection.
    ///
    /// Fails with [`ConnectionError::InvalidRetryCount`] when `max_retries` is 0.
    pub fn new(
        address: impl Into<String>,
        port: u16,
        max_retries: u32,
    ) -> Result<Self, ConnectionError> {
        if max_retries == 0 {
            return Err(ConnectionError::InvalidRetryCount);
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            address: address.into(),
            port,
            max_retries,
            retry_delay: Duration::ZERO,
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            initialised: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            closing: Notify::new(),
            events,
        })
    }

    /// Wait between failed attempts. Up to half the delay is added as jitter.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether the last `initialise` (or reconnect) round succeeded.
    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::Acquire)
    }

    /// Number of successful connects so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Observe lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Connect, trying at most `max_retries` times.
    pub async fn initialise(&self) -> Result<(), ConnectionError> {
        self.disposed.store(false, Ordering::Release);
        self.connect_round().await
    }

    async fn connect_round(&self) -> Result<(), ConnectionError> {
        self.initialised.store(false, Ordering::Release);

        for attempt in 1..=self.max_retries {
            self.set_state(ConnectionState::Connecting);
            debug!(address = %self.address, port = self.port, attempt, "Connecting");

            match TcpStream::connect((self.address.as_str(), self.port)).await {
                Ok(stream) => {
                    let info = ConnectionInfo {
                        address: self.address.clone(),
                        port: self.port,
                        peer_addr: stream.peer_addr().ok(),
                        attempt,
                    };
                    self.install(stream).await;
                    info!(address = %self.address, port = self.port, attempt, "Connected");
                    self.emit(ConnectionEvent::Connected(info));
                    return Ok(());
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    warn!(
                        address = %self.address,
                        port = self.port,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Connect attempt failed"
                    );
                    self.emit(ConnectionEvent::Disconnected(e.to_string()));

                    if attempt < self.max_retries {
                        self.backoff().await;
                    }
                }
            }
        }

        Err(ConnectionError::RetriesExhausted {
            address: self.address.clone(),
            port: self.port,
            attempts: self.max_retries,
        })
    }

    async fn install(&self, stream: TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        let (read_half, write_half) = stream.into_split();

        *self.reader.lock().await = Some(FramedRead::new(read_half, LineCodec::new()));
        *self.writer.lock().await = Some(FramedWrite::new(write_half, LineCodec::new()));

        self.generation.fetch_add(1, Ordering::AcqRel);
        self.set_state(ConnectionState::Connected);
        self.initialised.store(true, Ordering::Release);
    }

    async fn backoff(&self) {
        if self.retry_delay.is_zero() {
            return;
        }
        let max_jitter = (self.retry_delay.as_millis() / 2) as u64;
        let jitter = rand::thread_rng().gen_range(0..=max_jitter);
        tokio::time::sleep(self.retry_delay + Duration::from_millis(jitter)).await;
    }

    /// Write one line (the codec appends `\r\n`) and flush it.
    pub async fn send(&self, line: &str) -> Result<(), ConnectionError> {
        {
            let mut guard = self.writer.lock().await;
            let writer = guard.as_mut().ok_or(ConnectionError::NotConnected)?;
            writer.send(line.to_owned()).await?;
        }

        debug!(line, "Flushed");
        self.emit(ConnectionEvent::Flushed(line.to_owned()));
        Ok(())
    }

    /// Wait for the next line from the server.
    ///
    /// Returns `None` when nothing could be read. A closed or missing
    /// stream triggers one bounded reconnect round before returning.
    pub async fn listen(&self) -> Option<String> {
        if self.disposed.load(Ordering::Acquire) {
            return None;
        }

        let mut guard = self.reader.lock().await;
        if guard.is_none() {
            drop(guard);
            self.log("No stream to listen on, reconnecting");
            self.reconnect().await;
            return None;
        }

        let closing = self.closing.notified();
        let reader = guard.as_mut()?;
        let next = tokio::select! {
            next = reader.next() => next,
            _ = closing => return None,
        };

        match next {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                warn!(error = %e, "Read failed");
                None
            }
            None => {
                guard.take();
                drop(guard);
                self.writer.lock().await.take();
                self.set_state(ConnectionState::Disconnected);
                self.initialised.store(false, Ordering::Release);

                self.log("Stream closed by server, reconnecting");
                self.reconnect().await;
                None
            }
        }
    }

    async fn reconnect(&self) {
        if let Err(e) = self.connect_round().await {
            warn!(error = %e, "Reconnect failed");
        }
    }

    /// Release the stream. Safe to call more than once.
    pub async fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.closing.notify_waiters();

        let writer = self.writer.lock().await.take();
        let reader = self.reader.lock().await.take();
        self.set_state(ConnectionState::Disconnected);
        self.initialised.store(false, Ordering::Release);

        let released = writer.is_some() || reader.is_some();
        if let Some(mut writer) = writer {
            let _ = writer.close().await;
        }
        if released {
            self.log("Connection disposed");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn log(&self, message: &str) {
        info!(address = %self.address, port = self.port, "{message}");
        self.emit(ConnectionEvent::Logged(message.to_owned()));
    }

    fn emit(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("max_retries", &self.max_retries)
            .field("state", &self.state())
            .finish()
    }
}
