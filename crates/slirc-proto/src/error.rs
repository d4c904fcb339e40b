//! Error types for the IRC protocol library.
//!
//! [`ProtocolError`] covers framing and I/O failures on the wire,
//! [`MessageParseError`] explains why a line did not match the message
//! grammar.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound line exceeded the maximum allowed length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual message length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Illegal control character in an outbound line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// A line could not be parsed as an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Reasons a line failed the message grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Tags section was not followed by a message body.
    #[error("unterminated tags section")]
    UnterminatedTags,

    /// Line did not match `:<sender> <command> <recipient> [tail]`.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte offset where matching stopped.
        position: usize,
        /// What the parser was looking for.
        context: String,
    },
}
