use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use smallvec::SmallVec;

use crate::chan::ChannelExt;

/// Presentation hook injected into a [`Message`].
///
/// Parsing never depends on how a message is shown; callers that render
/// messages (logs, bridges) supply one of these instead.
pub type Formatter = Arc<dyn Fn(&Message) -> String + Send + Sync>;

/// A line received from an IRC server, broken into its fields.
///
/// All fields are filled in by [`Message::parse`]. A line that does not
/// match the message grammar keeps its `raw` text but has no `command`.
///
/// # Example
///
/// ```
/// use slirc_proto::Message;
///
/// let msg = Message::parse("@time=2023-01-01T00:00:00Z :nick!user@host PRIVMSG #ch :Hi there");
/// assert!(msg.is_extended_format);
/// assert_eq!(msg.tag_value("time"), Some("2023-01-01T00:00:00Z"));
/// assert_eq!(msg.split_args.as_slice(), ["Hi", "there"]);
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Message {
    /// The line as received, without its terminator.
    pub raw: String,
    /// IRCv3 tags in wire order.
    pub tags: Vec<Tag>,
    /// Whether the line carried an IRCv3 tag prefix.
    pub is_extended_format: bool,
    /// Sender nickname (or the whole sender token for server prefixes).
    pub nickname: String,
    /// Sender user field with any leading `~` removed.
    pub realname: String,
    /// Sender hostname (or the whole sender token for server prefixes).
    pub hostname: String,
    /// Command token, `None` when the line did not match the grammar.
    pub command: Option<String>,
    /// Recipient of the message (channel, nickname or server target).
    pub origin: String,
    /// Everything after the recipient.
    pub args: String,
    /// `args` split into at most four fields; the last keeps its spaces.
    pub split_args: SmallVec<[String; 4]>,
    /// When the line was parsed.
    pub timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) formatter: Option<Formatter>,
}

impl Message {
    pub(crate) fn empty(raw: &str) -> Self {
        Self {
            raw: raw.to_owned(),
            tags: Vec::new(),
            is_extended_format: false,
            nickname: String::new(),
            realname: String::new(),
            hostname: String::new(),
            command: None,
            origin: String::new(),
            args: String::new(),
            split_args: SmallVec::new(),
            timestamp: Utc::now(),
            formatter: None,
        }
    }

    /// Parse a line and attach a presentation formatter to the result.
    pub fn parse_with_formatter(raw: &str, formatter: Formatter) -> Self {
        Self::parse(raw).with_formatter(formatter)
    }

    /// Replace the presentation formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Render the message through its formatter, or return the raw line.
    pub fn formatted(&self) -> String {
        match &self.formatter {
            Some(formatter) => formatter(self),
            None => self.raw.clone(),
        }
    }

    /// The command token, if the line matched the grammar.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Whether the message carries a command and can be dispatched.
    pub fn is_routable(&self) -> bool {
        self.command.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Get one of the split argument fields.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.split_args.get(index).map(String::as_str)
    }

    /// Get the value of an IRCv3 tag by key.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|Tag(k, _)| k == key)
            .map(|Tag(_, v)| v.as_str())
    }

    /// Get the appropriate target for a reply.
    ///
    /// Channel messages are answered in the channel, everything else goes
    /// back to the sender's nickname.
    pub fn response_target(&self) -> &str {
        if self.origin.is_channel_name() {
            &self.origin
        } else {
            &self.nickname
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("raw", &self.raw)
            .field("tags", &self.tags)
            .field("nickname", &self.nickname)
            .field("realname", &self.realname)
            .field("hostname", &self.hostname)
            .field("command", &self.command)
            .field("origin", &self.origin)
            .field("args", &self.args)
            .field("timestamp", &self.timestamp)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

/// An IRCv3 message tag.
///
/// A tag sent without `=` is stored with an empty value.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Tag(
    /// Tag key (e.g., `time`, `msgid`).
    pub String,
    /// Unescaped tag value.
    pub String,
);

impl Tag {
    /// Create a new tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag(key.into(), value.into())
    }
}
