//! Line-based codec for tokio.
//!
//! Reads newline-terminated lines from a server and writes `\r\n`
//! terminated lines back. Decoding is lenient: invalid UTF-8 is replaced
//! and over-long lines are skipped, so a single bad line never ends the
//! stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::{self, ProtocolError};
use crate::format::is_illegal_control_char;

/// Maximum accepted line length: 8191 bytes of tags plus a 512 byte body.
pub const MAX_IRC_LINE_LEN: usize = 8191 + 512;

/// Newline codec for IRC connections.
///
/// Decoded lines have their `\r\n` removed; encoded lines get it appended.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
    /// Set while skipping the rest of an over-long line
    discarding: bool,
}

impl LineCodec {
    /// Create a codec accepting lines up to [`MAX_IRC_LINE_LEN`].
    pub fn new() -> Self {
        Self::with_max_len(MAX_IRC_LINE_LEN)
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    /// Sanitize an outbound line.
    ///
    /// Truncates at the first line ending and rejects illegal control
    /// characters, so one call can never put two lines on the wire.
    /// Anything after the line ending besides the terminator itself is
    /// dropped with a warning.
    pub fn sanitize(line: &str) -> error::Result<&str> {
        let end = line.find(['\r', '\n']).unwrap_or(line.len());
        let dropped = line[end..].trim_start_matches(['\r', '\n']);
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), "Truncating outbound line at embedded line break");
        }
        let line = &line[..end];

        match line.chars().find(|&ch| is_illegal_control_char(ch)) {
            Some(ch) => Err(ProtocolError::IllegalControlChar(ch)),
            None => Ok(line),
        }
    }

    fn text(line: &[u8]) -> String {
        String::from_utf8_lossy(line)
            .trim_end_matches(['\r', '\n'])
            .to_owned()
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    warn!(
                        buffered = src.len(),
                        limit = self.max_len,
                        "Discarding over-long line"
                    );
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() > self.max_len {
                warn!(length = line.len(), limit = self.max_len, "Discarding over-long line");
                continue;
            }

            return Ok(Some(Self::text(&line)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() || self.discarding {
            src.clear();
            return Ok(None);
        }

        let line = src.split_to(src.len());
        self.next_index = 0;
        Ok(Some(Self::text(&line)))
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        let line = Self::sanitize(&line)?;
        if line.len() + 2 > self.max_len {
            return Err(ProtocolError::MessageTooLong {
                actual: line.len() + 2,
                limit: self.max_len,
            });
        }

        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
