//! Session - one registered presence on a server.
//!
//! ## State Machine
//!
//! ```text
//! ┌────────────────┐  initialise()  ┌──────────────┐  connected  ┌─────────────┐
//! │ Uninitialised  │ ─────────────▶ │ Initialising │ ──────────▶ │ Initialised │
//! └────────────────┘                └──────────────┘             └─────────────┘
//!         ▲                                │ retries exhausted          │
//!         └────────────────────────────────┴──────────── dispose() ─────┘
//! ```
//!
//! The session answers PING itself and hands every other routable line back
//! to its caller. Roster changes go through [`Session::add_channel`] and
//! [`Session::remove_channel`], which send the matching JOIN / PART while
//! holding the roster lock.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use parking_lot::Mutex as SyncMutex;
use slirc_proto::chan::strip_membership_prefix;
use slirc_proto::{ChannelExt, Command, Formatter, Message};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::channel::Channel;
use crate::error::SessionError;
use crate::network::Connection;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Uninitialised = 0,
    Initialising = 1,
    Initialised = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initialising,
            2 => Self::Initialised,
            _ => Self::Uninitialised,
        }
    }
}

/// Registration details, kept so the session can re-register after a
/// reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    nickname: String,
    realname: String,
}

/// A client session: one connection plus the joined-channel roster.
pub struct Session {
    connection: Connection,
    password: Option<String>,
    formatter: Option<Formatter>,
    roster: Mutex<Vec<Channel>>,
    identity: SyncMutex<Option<Identity>>,
    identified: AtomicBool,
    /// Connection generation the current registration was sent on.
    registered_generation: AtomicU64,
    state: AtomicU8,
}

impl Session {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            password: None,
            formatter: None,
            roster: Mutex::new(Vec::new()),
            identity: SyncMutex::new(None),
            identified: AtomicBool::new(false),
            registered_generation: AtomicU64::new(0),
            state: AtomicU8::new(SessionState::Uninitialised as u8),
        }
    }

    /// Send `PASS` before registering.
    #[must_use]
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Attach a presentation formatter to every parsed message.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Whether NICK/USER were sent on the current connection.
    pub fn is_identified(&self) -> bool {
        self.identified.load(Ordering::Acquire)
    }

    /// The registered nickname, tracking server-side NICK changes.
    pub fn nickname(&self) -> Option<String> {
        self.identity.lock().as_ref().map(|i| i.nickname.clone())
    }

    /// Connect the underlying connection.
    ///
    /// The session ends up `Initialised` iff the connection is up, with an
    /// empty roster.
    pub async fn initialise(&self) -> Result<(), SessionError> {
        self.set_state(SessionState::Initialising);

        match self.connection.initialise().await {
            Ok(()) => {
                // A new connection starts outside every channel.
                self.roster.lock().await.clear();
                self.set_state(SessionState::Initialised);
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Uninitialised);
                Err(e.into())
            }
        }
    }

    /// Register with the server: `PASS` (if configured), `USER`, then `NICK`.
    pub async fn send_identity(&self, nickname: &str, realname: &str) -> Result<(), SessionError> {
        let identity = Identity {
            nickname: nickname.to_owned(),
            realname: realname.to_owned(),
        };
        self.register(&identity).await?;
        *self.identity.lock() = Some(identity);
        Ok(())
    }

    async fn register(&self, identity: &Identity) -> Result<(), SessionError> {
        if let Some(password) = &self.password {
            self.send_command(Command::PASS(password.clone())).await?;
        }
        self.send_command(Command::user(&identity.nickname, &identity.realname))
            .await?;
        self.send_command(Command::nick(&identity.nickname)).await?;

        self.registered_generation
            .store(self.connection.generation(), Ordering::Release);
        self.identified.store(true, Ordering::Release);
        info!(nickname = %identity.nickname, "Identity sent");
        Ok(())
    }

    /// Send a raw line.
    pub async fn send_raw(&self, line: &str) -> Result<(), SessionError> {
        self.connection.send(line).await?;
        Ok(())
    }

    pub async fn send_command(&self, command: Command) -> Result<(), SessionError> {
        self.send_raw(&command.to_string()).await
    }

    /// Read and classify one line.
    ///
    /// PING is answered here and yields `None`, as do unreadable and
    /// unroutable lines. Everything else is returned for dispatch.
    pub async fn listen_cycle(&self) -> Option<Message> {
        let Some(line) = self.connection.listen().await else {
            self.restore_after_reconnect().await;
            return None;
        };

        if line.starts_with("PING") {
            let token = line.get(5..).unwrap_or("");
            if let Err(e) = self.send_command(Command::pong(token)).await {
                warn!(error = %e, "Failed to answer PING");
            }
            return None;
        }

        let message = match &self.formatter {
            Some(formatter) => Message::parse_with_formatter(&line, formatter.clone()),
            None => Message::parse(&line),
        };
        if !message.is_routable() {
            debug!(raw = %message.raw, "Dropping unroutable line");
            return None;
        }

        self.track_membership(&message).await;
        Some(message)
    }

    /// Re-register and rejoin after `listen` reconnected behind our back.
    async fn restore_after_reconnect(&self) {
        if !self.connection.is_connected() {
            self.identified.store(false, Ordering::Release);
            return;
        }

        let generation = self.connection.generation();
        if generation == self.registered_generation.load(Ordering::Acquire) {
            return;
        }
        let Some(identity) = self.identity.lock().clone() else {
            return;
        };

        info!(generation, nickname = %identity.nickname, "Re-registering after reconnect");
        if let Err(e) = self.register(&identity).await {
            warn!(error = %e, "Re-registration failed");
            return;
        }

        let mut roster = self.roster.lock().await;
        for channel in roster.iter_mut() {
            channel.clear_inhabitants();
            if let Err(e) = self.send_command(Command::join(channel.name())).await {
                warn!(channel = %channel.name(), error = %e, "Rejoin failed");
            }
        }
    }

    /// Add a channel to the roster and JOIN it.
    ///
    /// Returns `Ok(false)` without sending anything when a channel of that
    /// name is already present.
    pub async fn add_channel(&self, name: &str) -> Result<bool, SessionError> {
        let mut roster = self.roster.lock().await;
        if roster.iter().any(|c| c.name() == name) {
            debug!(channel = %name, "Channel already in roster");
            return Ok(false);
        }

        self.send_command(Command::join(name)).await?;
        roster.push(Channel::new(name));
        Ok(true)
    }

    /// Remove a channel from the roster and PART it.
    ///
    /// Returns `Ok(false)` without sending anything when the channel is
    /// not in the roster.
    pub async fn remove_channel(&self, name: &str) -> Result<bool, SessionError> {
        let mut roster = self.roster.lock().await;
        let Some(index) = roster.iter().position(|c| c.name() == name) else {
            debug!(channel = %name, "Channel not in roster");
            return Ok(false);
        };

        self.send_command(Command::part(name)).await?;
        roster.remove(index);
        Ok(true)
    }

    pub async fn channel(&self, name: &str) -> Option<Channel> {
        self.roster
            .lock()
            .await
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Snapshot of the roster in join order.
    pub async fn channels(&self) -> Vec<Channel> {
        self.roster.lock().await.clone()
    }

    /// Every inhabitant of every channel, in roster order.
    pub async fn all_users(&self) -> Vec<String> {
        self.roster
            .lock()
            .await
            .iter()
            .flat_map(|c| c.inhabitants().iter().cloned())
            .collect()
    }

    /// Update channel inhabitants from inbound traffic.
    async fn track_membership(&self, message: &Message) {
        let Some(command) = message.command() else {
            return;
        };
        let sender = message.nickname.as_str();

        match command {
            "JOIN" => {
                self.with_channel(&message.origin, |c| {
                    c.add_inhabitant(sender);
                })
                .await;
            }
            "PART" => {
                self.with_channel(&message.origin, |c| {
                    c.remove_inhabitant(sender);
                })
                .await;
            }
            "KICK" => {
                let Some(victim) = message.arg(0) else {
                    return;
                };
                if self.is_me(victim) {
                    let mut roster = self.roster.lock().await;
                    roster.retain(|c| c.name() != message.origin);
                    info!(channel = %message.origin, by = %sender, "Kicked from channel");
                } else {
                    self.with_channel(&message.origin, |c| {
                        c.remove_inhabitant(victim);
                    })
                    .await;
                }
            }
            "QUIT" => {
                for channel in self.roster.lock().await.iter_mut() {
                    channel.remove_inhabitant(sender);
                }
            }
            "NICK" => {
                let new_nick = message.origin.as_str();
                if self.is_me(sender)
                    && let Some(identity) = self.identity.lock().as_mut()
                {
                    identity.nickname = new_nick.to_owned();
                }
                for channel in self.roster.lock().await.iter_mut() {
                    channel.rename_inhabitant(sender, new_nick);
                }
            }
            "353" => {
                if let Some((channel, names)) = parse_names_reply(&message.args) {
                    self.with_channel(channel, |c| {
                        for name in names {
                            c.add_inhabitant(strip_membership_prefix(name));
                        }
                    })
                    .await;
                }
            }
            _ => {}
        }
    }

    async fn with_channel<F>(&self, name: &str, f: F)
    where
        F: FnOnce(&mut Channel),
    {
        let mut roster = self.roster.lock().await;
        if let Some(channel) = roster.iter_mut().find(|c| c.name() == name) {
            f(channel);
        }
    }

    fn is_me(&self, nickname: &str) -> bool {
        self.identity
            .lock()
            .as_ref()
            .is_some_and(|i| i.nickname.eq_ignore_ascii_case(nickname))
    }

    /// Release the connection and forget the roster. Safe to call more
    /// than once.
    pub async fn dispose(&self) {
        self.connection.dispose().await;
        self.roster.lock().await.clear();
        self.identified.store(false, Ordering::Release);
        self.set_state(SessionState::Uninitialised);
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Split the tail of RPL_NAMREPLY (`[=*@] <channel> :<names>`) into the
/// channel and its names.
fn parse_names_reply(args: &str) -> Option<(&str, std::str::SplitWhitespace<'_>)> {
    let mut rest = args.trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', '*', '@']) {
        if !stripped.is_channel_name() {
            rest = stripped.trim_start();
        }
    }

    let (channel, names) = rest.split_once(' ').unwrap_or((rest, ""));
    if !channel.is_channel_name() {
        return None;
    }
    let names = names.trim_start();
    Some((channel, names.strip_prefix(':').unwrap_or(names).split_whitespace()))
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("state", &self.state())
            .field("identified", &self.is_identified())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::TcpListener;
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

    struct Peer {
        lines: Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
    }

    impl Peer {
        async fn recv(&mut self) -> String {
            self.lines.next_line().await.unwrap().unwrap()
        }

        async fn push(&mut self, line: &str) {
            self.writer
                .write_all(format!("{line}\r\n").as_bytes())
                .await
                .unwrap();
        }
    }

    async fn connected_session() -> (Session, Peer) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let session = Session::new(Connection::new("127.0.0.1", port, 1).unwrap());
        session.initialise().await.unwrap();

        let (socket, _) = listener.accept().await.unwrap();
        let (read_half, writer) = socket.into_split();
        let peer = Peer {
            lines: BufReader::new(read_half).lines(),
            writer,
        };
        (session, peer)
    }

    #[test]
    fn names_reply_with_and_without_type() {
        let (channel, names) = parse_names_reply("= #rust :@alice +bob carol").unwrap();
        assert_eq!(channel, "#rust");
        assert_eq!(names.collect::<Vec<_>>(), ["@alice", "+bob", "carol"]);

        let (channel, names) = parse_names_reply("#rust :dave").unwrap();
        assert_eq!(channel, "#rust");
        assert_eq!(names.collect::<Vec<_>>(), ["dave"]);

        assert!(parse_names_reply("= nochannel :x").is_none());
    }

    #[tokio::test]
    async fn initialise_failure_returns_to_uninitialised() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let session = Session::new(Connection::new("127.0.0.1", port, 1).unwrap());
        assert!(session.initialise().await.is_err());
        assert_eq!(session.state(), SessionState::Uninitialised);
    }

    #[tokio::test]
    async fn identity_sends_pass_user_nick() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let session = Session::new(Connection::new("127.0.0.1", port, 1).unwrap())
            .with_password(Some("secret".into()));
        session.initialise().await.unwrap();
        assert_eq!(session.state(), SessionState::Initialised);

        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();

        session.send_identity("bot", "Bot Realname").await.unwrap();
        assert!(session.is_identified());
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "PASS secret");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "USER bot 0 * Bot Realname");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NICK bot");
    }

    #[tokio::test]
    async fn ping_is_answered_and_not_returned() {
        let (session, mut peer) = connected_session().await;

        peer.push("PING :12345").await;
        assert!(session.listen_cycle().await.is_none());
        assert_eq!(peer.recv().await, "PONG :12345");
    }

    #[tokio::test]
    async fn unroutable_lines_are_dropped() {
        let (session, mut peer) = connected_session().await;

        peer.push("NOTICE AUTH :*** Looking up your hostname").await;
        peer.push(":alice!a@host PRIVMSG #rust :hi").await;

        assert!(session.listen_cycle().await.is_none());
        let message = session.listen_cycle().await.unwrap();
        assert_eq!(message.command(), Some("PRIVMSG"));
    }

    #[tokio::test]
    async fn duplicate_channel_sends_single_join() {
        let (session, mut peer) = connected_session().await;

        assert!(session.add_channel("#rust").await.unwrap());
        assert!(!session.add_channel("#rust").await.unwrap());
        assert!(session.add_channel("#slirc").await.unwrap());

        assert_eq!(peer.recv().await, "JOIN #rust");
        assert_eq!(peer.recv().await, "JOIN #slirc");
        let names: Vec<String> = session
            .channels()
            .await
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, ["#rust", "#slirc"]);
    }

    #[tokio::test]
    async fn removing_absent_channel_sends_nothing() {
        let (session, mut peer) = connected_session().await;

        assert!(!session.remove_channel("#nowhere").await.unwrap());
        session.add_channel("#rust").await.unwrap();
        assert!(session.remove_channel("#rust").await.unwrap());

        assert_eq!(peer.recv().await, "JOIN #rust");
        assert_eq!(peer.recv().await, "PART #rust");
        assert!(session.channel("#rust").await.is_none());
    }

    #[tokio::test]
    async fn membership_follows_traffic() {
        let (session, mut peer) = connected_session().await;
        session.send_identity("bot", "bot").await.unwrap();
        session.add_channel("#rust").await.unwrap();
        session.add_channel("#slirc").await.unwrap();

        for line in [
            ":srv 353 bot = #rust :bot @alice +bob",
            ":carol!c@host JOIN :#rust",
            ":carol!c@host JOIN #slirc",
            ":bob!b@host PART #rust :bye",
            ":alice!a@host NICK :alicia",
            ":carol!c@host QUIT :Quit: gone",
            ":dave!d@host JOIN #elsewhere",
        ] {
            peer.push(line).await;
            session.listen_cycle().await;
        }

        let rust = session.channel("#rust").await.unwrap();
        assert_eq!(rust.inhabitants(), ["bot", "alicia"]);
        assert!(session.channel("#slirc").await.unwrap().inhabitants().is_empty());
        assert_eq!(session.all_users().await, ["bot", "alicia"]);
    }

    #[tokio::test]
    async fn kick_of_self_drops_channel() {
        let (session, mut peer) = connected_session().await;
        session.send_identity("bot", "bot").await.unwrap();
        session.add_channel("#rust").await.unwrap();

        peer.push(":op!o@host KICK #rust Bot :behave").await;
        session.listen_cycle().await;

        assert!(session.channel("#rust").await.is_none());
    }

    #[tokio::test]
    async fn own_nick_change_is_tracked() {
        let (session, mut peer) = connected_session().await;
        session.send_identity("bot", "bot").await.unwrap();

        peer.push(":bot!b@host NICK :bot_").await;
        session.listen_cycle().await;

        assert_eq!(session.nickname().as_deref(), Some("bot_"));
    }

    #[tokio::test]
    async fn double_dispose_is_noop() {
        let (session, _peer) = connected_session().await;
        session.send_identity("bot", "bot").await.unwrap();

        session.dispose().await;
        session.dispose().await;
        assert!(!session.is_connected());
        assert!(!session.is_identified());
        assert_eq!(session.state(), SessionState::Uninitialised);
    }
}
