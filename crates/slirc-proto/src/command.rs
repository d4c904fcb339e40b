//! Outbound IRC commands.
//!
//! The client only ever sends a handful of commands; each serializes to
//! the plain `TOKEN arg arg` form the server expects, without the line
//! terminator (the codec adds `\r\n`).

use std::fmt::{self, Display, Formatter};

/// A command sent from the client to the server.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Command {
    /// `PASS <password>`
    PASS(String),
    /// `NICK <nickname>`
    NICK(String),
    /// `USER <username> 0 * <realname>`
    USER(String, String),
    /// `JOIN <channel>`
    JOIN(String),
    /// `PART <channel>`
    PART(String),
    /// `PONG <token>`; the token is echoed exactly as the PING carried it.
    PONG(String),
    /// `PRIVMSG <target> :<text>`
    PRIVMSG(String, String),
    /// `NOTICE <target> :<text>`
    NOTICE(String, String),
    /// `QUIT [:<reason>]`
    QUIT(Option<String>),
    /// A line passed through untouched.
    Raw(String),
}

impl Command {
    /// Create a JOIN for a channel.
    pub fn join(channel: impl Into<String>) -> Self {
        Command::JOIN(channel.into())
    }

    /// Create a PART for a channel.
    pub fn part(channel: impl Into<String>) -> Self {
        Command::PART(channel.into())
    }

    /// Create a NICK registration or change.
    pub fn nick(nickname: impl Into<String>) -> Self {
        Command::NICK(nickname.into())
    }

    /// Create a USER registration.
    pub fn user(username: impl Into<String>, realname: impl Into<String>) -> Self {
        Command::USER(username.into(), realname.into())
    }

    /// Create a PONG echoing a PING token.
    pub fn pong(token: impl Into<String>) -> Self {
        Command::PONG(token.into())
    }

    /// Create a PRIVMSG.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::PRIVMSG(target.into(), text.into())
    }

    /// Create a NOTICE.
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::NOTICE(target.into(), text.into())
    }

    /// The command token, or `None` for raw lines.
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            Command::PASS(_) => "PASS",
            Command::NICK(_) => "NICK",
            Command::USER(..) => "USER",
            Command::JOIN(_) => "JOIN",
            Command::PART(_) => "PART",
            Command::PONG(_) => "PONG",
            Command::PRIVMSG(..) => "PRIVMSG",
            Command::NOTICE(..) => "NOTICE",
            Command::QUIT(_) => "QUIT",
            Command::Raw(_) => return None,
        })
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(password) => write!(f, "PASS {password}"),
            Command::NICK(nickname) => write!(f, "NICK {nickname}"),
            Command::USER(username, realname) => write!(f, "USER {username} 0 * {realname}"),
            Command::JOIN(channel) => write!(f, "JOIN {channel}"),
            Command::PART(channel) => write!(f, "PART {channel}"),
            Command::PONG(token) => write!(f, "PONG {token}"),
            Command::PRIVMSG(target, text) => write!(f, "PRIVMSG {target} :{text}"),
            Command::NOTICE(target, text) => write!(f, "NOTICE {target} :{text}"),
            Command::QUIT(None) => f.write_str("QUIT"),
            Command::QUIT(Some(reason)) => write!(f, "QUIT :{reason}"),
            Command::Raw(line) => f.write_str(line),
        }
    }
}
