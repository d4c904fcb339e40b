//! Inbound IRC message types and parsing.

mod parse;
/// IRCv3 tag utilities.
pub mod tags;
mod types;

pub use self::types::{Formatter, Message, Tag};
