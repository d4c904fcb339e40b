//! Integration tests for the session: registration, keepalive, roster and
//! membership tracking against a mock server.

mod common;

use std::time::Duration;

use common::{MockServer, ServerPeer};
use slirc_proto::Message;
use slircbot::network::Connection;
use slircbot::state::{Session, SessionState};

async fn connected_session(server: &MockServer, password: Option<&str>) -> (Session, ServerPeer) {
    let connection = Connection::new(server.address(), server.port(), 3).unwrap();
    let session = Session::new(connection).with_password(password.map(str::to_string));
    session.initialise().await.expect("session initialise");
    let peer = server.accept().await.expect("accept");
    (session, peer)
}

/// Run listen cycles until one yields a message.
async fn next_message(session: &Session) -> Message {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(message) = session.listen_cycle().await {
                return message;
            }
        }
    })
    .await
    .expect("no message within timeout")
}

#[tokio::test]
async fn test_registration_order_with_password() {
    let server = MockServer::bind().await.unwrap();
    let (session, mut peer) = connected_session(&server, Some("hunter2")).await;
    assert_eq!(session.state(), SessionState::Initialised);

    session.send_identity("bot", "Straylight Bot").await.unwrap();

    assert_eq!(peer.recv_line().await.unwrap(), "PASS hunter2");
    assert_eq!(peer.recv_line().await.unwrap(), "USER bot 0 * Straylight Bot");
    assert_eq!(peer.recv_line().await.unwrap(), "NICK bot");
    assert!(session.is_identified());
    assert_eq!(session.nickname().as_deref(), Some("bot"));
}

#[tokio::test]
async fn test_ping_is_answered_and_not_surfaced() {
    let server = MockServer::bind().await.unwrap();
    let (session, mut peer) = connected_session(&server, None).await;

    peer.send_line("PING :irc.test").await.unwrap();
    peer.send_line(":alice!a@host PRIVMSG #rust :hi").await.unwrap();

    let message = next_message(&session).await;
    assert_eq!(message.command(), Some("PRIVMSG"));
    assert_eq!(message.args, "hi");
    assert_eq!(peer.recv_line().await.unwrap(), "PONG :irc.test");
}

#[tokio::test]
async fn test_unroutable_lines_are_dropped() {
    let server = MockServer::bind().await.unwrap();
    let (session, mut peer) = connected_session(&server, None).await;

    peer.send_line("this is not irc").await.unwrap();
    peer.send_line("ERROR :Closing Link").await.unwrap();

    let message = next_message(&session).await;
    assert_eq!(message.command(), Some("ERROR"));
    assert_eq!(message.args, "Closing Link");
}

#[tokio::test]
async fn test_roster_add_and_remove() {
    let server = MockServer::bind().await.unwrap();
    let (session, mut peer) = connected_session(&server, None).await;

    assert!(session.add_channel("#rust").await.unwrap());
    assert_eq!(peer.recv_line().await.unwrap(), "JOIN #rust");

    assert!(!session.add_channel("#rust").await.unwrap());
    assert!(!session.remove_channel("#nowhere").await.unwrap());
    peer.expect_silence(Duration::from_millis(100)).await.unwrap();

    assert!(session.remove_channel("#rust").await.unwrap());
    assert_eq!(peer.recv_line().await.unwrap(), "PART #rust");
    assert!(session.channels().await.is_empty());
}

#[tokio::test]
async fn test_membership_follows_server_traffic() {
    let server = MockServer::bind().await.unwrap();
    let (session, mut peer) = connected_session(&server, None).await;
    session.send_identity("bot", "bot").await.unwrap();
    session.add_channel("#rust").await.unwrap();
    peer.recv_until("JOIN #rust").await.unwrap();

    peer.send_line(":irc.test 353 bot = #rust :bot @alice +carol").await.unwrap();
    peer.send_line(":dave!d@host JOIN #rust").await.unwrap();
    peer.send_line(":alice!a@host NICK alicia").await.unwrap();
    peer.send_line(":carol!c@host QUIT :bye").await.unwrap();
    peer.send_line(":alicia!a@host KICK #rust dave :out").await.unwrap();
    for _ in 0..5 {
        next_message(&session).await;
    }

    let channel = session.channel("#rust").await.expect("channel in roster");
    assert_eq!(channel.inhabitants(), ["bot", "alicia"]);
    assert_eq!(session.all_users().await, ["bot", "alicia"]);

    peer.send_line(":alicia!a@host KICK #rust bot :you too").await.unwrap();
    next_message(&session).await;
    assert!(session.channel("#rust").await.is_none());
}

#[tokio::test]
async fn test_reregisters_and_rejoins_after_reconnect() {
    let server = MockServer::bind().await.unwrap();
    let (session, mut first) = connected_session(&server, None).await;
    session.send_identity("bot", "bot").await.unwrap();
    session.add_channel("#rust").await.unwrap();
    first.recv_until("JOIN #rust").await.unwrap();

    drop(first);
    assert!(session.listen_cycle().await.is_none());

    let mut second = server.accept().await.unwrap();
    second.expect_registration("bot").await.unwrap();
    assert_eq!(second.recv_line().await.unwrap(), "JOIN #rust");
    assert_eq!(session.channels().await.len(), 1);
}

#[tokio::test]
async fn test_dispose_resets_state() {
    let server = MockServer::bind().await.unwrap();
    let (session, mut peer) = connected_session(&server, None).await;
    session.add_channel("#rust").await.unwrap();
    assert_eq!(peer.recv_line().await.unwrap(), "JOIN #rust");

    session.dispose().await;
    assert!(session.channels().await.is_empty());
    assert_eq!(session.state(), SessionState::Uninitialised);
    assert!(!session.is_connected());
    assert!(session.listen_cycle().await.is_none());
}
