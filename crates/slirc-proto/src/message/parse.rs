//! Message parsing implementation.
//!
//! Server lines follow `[@tags ]:<sender> <command> <recipient>[ ][:]<tail>`.
//! The grammar is matched with nom; the sender is then decomposed into
//! `nick!user@host` when it has that shape.

use std::str::FromStr;

use chrono::Utc;
use nom::{
    bytes::complete::take_while1,
    character::complete::{char, satisfy},
    combinator::opt,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::{MessageParseError, ProtocolError};

use super::tags::parse_tags_string;
use super::types::Message;

/// Number of fields the argument tail is split into.
const SPLIT_ARGS: usize = 4;

/// The pieces of a line that matched the message grammar.
#[derive(Debug, Clone, PartialEq)]
struct Grammar<'a> {
    sender: &'a str,
    command: &'a str,
    recipient: &'a str,
    tail: &'a str,
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

fn whitespace(input: &str) -> IResult<&str, char> {
    satisfy(char::is_whitespace)(input)
}

fn sender(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), token)(input)
}

fn grammar(input: &str) -> IResult<&str, Grammar<'_>> {
    let (input, sender) = sender(input)?;
    let (input, _) = whitespace(input)?;
    let (input, command) = token(input)?;
    let (input, _) = whitespace(input)?;
    let (input, recipient) = token(input)?;
    let (input, _) = opt(whitespace)(input)?;
    let (tail, _) = opt(char(':'))(input)?;

    Ok((
        "",
        Grammar {
            sender,
            command,
            recipient,
            tail,
        },
    ))
}

/// Split `<nick>!<user>@<host>` into its three parts.
fn split_sender(sender: &str) -> Option<(&str, &str, &str)> {
    let (nick, rest) = sender.split_once('!')?;
    let (user, host) = rest.split_once('@')?;

    if nick.is_empty() || user.is_empty() || host.is_empty() {
        return None;
    }
    Some((nick, user, host))
}

/// Split the trailing text on single spaces into at most [`SPLIT_ARGS`]
/// fields, trimming each. Runs of spaces yield empty fields so positions
/// stay stable; the last field keeps its inner spacing.
fn split_args(tail: &str) -> SmallVec<[String; 4]> {
    if tail.is_empty() {
        return SmallVec::new();
    }
    tail.splitn(SPLIT_ARGS, ' ')
        .map(|field| field.trim().to_owned())
        .collect()
}

/// Separate an optional `@tags ` prefix from the message body.
fn split_tags(line: &str) -> Result<(Option<&str>, &str), MessageParseError> {
    match line.strip_prefix('@') {
        Some(tagged) => tagged
            .split_once(' ')
            .map(|(tags, body)| (Some(tags), body))
            .ok_or(MessageParseError::UnterminatedTags),
        None => Ok((None, line)),
    }
}

fn grammar_error(line: &str, rest: &str) -> MessageParseError {
    MessageParseError::ParseContext {
        position: line.len() - rest.len(),
        context: "expected `:<sender> <command> <recipient>`".to_string(),
    }
}

impl Message {
    /// Parse a raw server line.
    ///
    /// Never fails: a line that does not match the grammar yields a message
    /// without a command. Use [`str::parse`] to get the reason instead.
    pub fn parse(raw: &str) -> Self {
        match Self::try_parse(raw) {
            Ok(msg) => msg,
            Err(_) => {
                let mut msg = Message::empty(raw.trim_end_matches(['\r', '\n']));
                // Tags are still worth keeping on a line the grammar rejects.
                if let Ok((Some(tags), _)) = split_tags(&msg.raw) {
                    msg.tags = parse_tags_string(tags);
                    msg.is_extended_format = true;
                }
                msg
            }
        }
    }

    /// Parse a raw server line, reporting why it did not match.
    pub fn try_parse(raw: &str) -> Result<Self, MessageParseError> {
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let mut msg = Message::empty(line);

        if line.starts_with("ERROR") {
            let rest = line.split_once(' ').map(|(_, rest)| rest).unwrap_or("");
            msg.command = Some("ERROR".to_owned());
            msg.args = rest.strip_prefix(':').unwrap_or(rest).to_owned();
            return Ok(msg);
        }

        let (tags, body) = split_tags(line)?;
        if let Some(tags) = tags {
            msg.tags = parse_tags_string(tags);
            msg.is_extended_format = true;
        }

        let parsed = match grammar(body) {
            Ok((_, parsed)) => parsed,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(grammar_error(line, e.input));
            }
            Err(nom::Err::Incomplete(_)) => return Err(grammar_error(line, "")),
        };

        msg.timestamp = Utc::now();
        msg.command = Some(parsed.command.to_owned());
        msg.origin = parsed
            .recipient
            .strip_prefix(':')
            .unwrap_or(parsed.recipient)
            .to_owned();
        msg.args = parsed.tail.to_owned();
        msg.split_args = split_args(parsed.tail);

        match split_sender(parsed.sender) {
            Some((nick, user, host)) => {
                msg.nickname = nick.to_owned();
                msg.realname = user.strip_prefix('~').unwrap_or(user).to_owned();
                msg.hostname = host.to_owned();
            }
            None => {
                msg.nickname = parsed.sender.to_owned();
                msg.realname = parsed.sender.to_lowercase();
                msg.hostname = parsed.sender.to_owned();
            }
        }

        Ok(msg)
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        Message::try_parse(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let msg = Message::parse(":nick!user@host.com PRIVMSG #chan :hello world");
        assert_eq!(msg.command(), Some("PRIVMSG"));
        assert_eq!(msg.origin, "#chan");
        assert_eq!(msg.args, "hello world");
        assert_eq!(msg.nickname, "nick");
        assert_eq!(msg.realname, "user");
        assert_eq!(msg.hostname, "host.com");
        assert!(!msg.is_extended_format);
    }

    #[test]
    fn test_parse_error_line() {
        let msg = Message::parse("ERROR :Closing Link");
        assert_eq!(msg.command(), Some("ERROR"));
        assert_eq!(msg.args, "Closing Link");
        assert!(msg.nickname.is_empty());
        assert!(msg.origin.is_empty());
    }

    #[test]
    fn test_parse_error_without_argument() {
        let msg = Message::parse("ERROR");
        assert_eq!(msg.command(), Some("ERROR"));
        assert_eq!(msg.args, "");
    }

    #[test]
    fn test_strips_tilde_from_user() {
        let msg = Message::parse(":nick!~ident@host PRIVMSG #chan :hi");
        assert_eq!(msg.realname, "ident");
    }

    #[test]
    fn test_server_sender_is_best_effort_identity() {
        let msg = Message::parse(":Irc.Example.Net 001 bot :Welcome to the network");
        assert_eq!(msg.command(), Some("001"));
        assert_eq!(msg.origin, "bot");
        assert_eq!(msg.nickname, "Irc.Example.Net");
        assert_eq!(msg.hostname, "Irc.Example.Net");
        assert_eq!(msg.realname, "irc.example.net");
    }

    #[test]
    fn test_recipient_colon_is_stripped() {
        let msg = Message::parse(":nick!user@host JOIN :#chan");
        assert_eq!(msg.command(), Some("JOIN"));
        assert_eq!(msg.origin, "#chan");
        assert_eq!(msg.args, "");
        assert!(msg.split_args.is_empty());
    }

    #[test]
    fn test_split_args_keeps_fourth_field_verbatim() {
        let msg = Message::parse(":n!u@h PRIVMSG #c :one two three four  five six");
        assert_eq!(
            msg.split_args.as_slice(),
            ["one", "two", "three", "four  five six"]
        );
        assert_eq!(msg.arg(3), Some("four  five six"));
    }

    #[test]
    fn test_split_args_consecutive_spaces_and_padding() {
        let msg = Message::parse(":n!u@h PRIVMSG #c :a  b");
        assert_eq!(msg.split_args.as_slice(), ["a", "", "b"]);
        assert_eq!(msg.arg(1), Some(""));

        let msg = Message::parse(":n!u@h PRIVMSG #c :one two three  four\t");
        assert_eq!(msg.split_args.as_slice(), ["one", "two", "three", "four"]);

        let msg = Message::parse(":n!u@h PRIVMSG #c :!say\thello");
        assert_eq!(msg.split_args.as_slice(), ["!say\thello"]);
    }

    #[test]
    fn test_parse_tags() {
        let msg = Message::parse("@time=2023-01-01T00:00:00Z;msgid=abc123;flag :n!u@h PRIVMSG #ch :Hi");
        assert!(msg.is_extended_format);
        assert_eq!(msg.tags.len(), 3);
        assert_eq!(msg.tags[0].0, "time");
        assert_eq!(msg.tags[1].0, "msgid");
        assert_eq!(msg.tag_value("flag"), Some(""));
        assert_eq!(msg.command(), Some("PRIVMSG"));
        assert_eq!(msg.args, "Hi");
    }

    #[test]
    fn test_parse_escaped_tags() {
        let msg = Message::parse("@key=value\\swith\\sspace :n!u@h PRIVMSG #c :x");
        assert_eq!(msg.tag_value("key"), Some("value with space"));
    }

    #[test]
    fn test_trailing_line_terminator_is_ignored() {
        let msg = Message::parse(":n!u@h PRIVMSG #c :x\r\n");
        assert_eq!(msg.args, "x");
        assert_eq!(msg.raw, ":n!u@h PRIVMSG #c :x");
    }

    #[test]
    fn test_grammar_mismatch_leaves_fields_unset() {
        let msg = Message::parse("NOTICE AUTH :*** Looking up your hostname");
        assert!(!msg.is_routable());
        assert!(msg.nickname.is_empty());
        assert!(msg.args.is_empty());
        assert_eq!(msg.raw, "NOTICE AUTH :*** Looking up your hostname");
    }

    #[test]
    fn test_two_token_line_does_not_match() {
        let result = Message::try_parse(":server PING");
        assert!(matches!(
            result,
            Err(MessageParseError::ParseContext { .. })
        ));
    }

    #[test]
    fn test_unterminated_tags() {
        assert_eq!(
            Message::try_parse("@a=b").unwrap_err(),
            MessageParseError::UnterminatedTags
        );
    }

    #[test]
    fn test_from_str_reports_invalid_line() {
        let result: Result<Message, _> = "".parse();
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidMessage {
                cause: MessageParseError::EmptyMessage,
                ..
            })
        ));
    }

    #[test]
    fn test_split_sender_rejects_partial_masks() {
        assert_eq!(split_sender("nick!user@host"), Some(("nick", "user", "host")));
        assert_eq!(split_sender("nick@host"), None);
        assert_eq!(split_sender("nick!user@"), None);
        assert_eq!(split_sender("server.name"), None);
    }
}
