//! # slirc-proto
//!
//! Wire-level building blocks for the slircbot IRC client: a lenient
//! parser for inbound server lines, IRCv3 tag handling, outbound command
//! serialization and a newline framing codec for tokio.
//!
//! ## Parsing server lines
//!
//! ```rust
//! use slirc_proto::Message;
//!
//! let msg = Message::parse(":nick!~user@host.com PRIVMSG #chan :hello world");
//!
//! assert_eq!(msg.command(), Some("PRIVMSG"));
//! assert_eq!(msg.origin, "#chan");
//! assert_eq!(msg.args, "hello world");
//! assert_eq!(msg.realname, "user");
//! ```
//!
//! Lines that do not match the `:<sender> <command> <recipient> <tail>`
//! grammar still produce a [`Message`], but without a command. Check
//! [`Message::is_routable`] before handing one to a dispatcher.
//!
//! ## Building outbound lines
//!
//! ```rust
//! use slirc_proto::Command;
//!
//! assert_eq!(Command::join("#rust").to_string(), "JOIN #rust");
//! assert_eq!(Command::user("bot", "Bot Realname").to_string(), "USER bot 0 * Bot Realname");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod chan;
pub mod command;
pub mod error;
pub mod format;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;

pub use self::chan::ChannelExt;
pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, MAX_IRC_LINE_LEN};
pub use self::message::{Formatter, Message, Tag};
