//! IRCv3 message tag parsing.

use super::types::Tag;

/// Parse the tag section of a line (without the leading `@`).
///
/// Tags keep their wire order. A tag written without `=` gets an empty
/// value, and empty entries between semicolons are skipped.
pub fn parse_tags_string(tags: &str) -> Vec<Tag> {
    tags.split(';')
        .filter(|s| !s.is_empty())
        .map(|tag| match tag.split_once('=') {
            Some((key, value)) => Tag::new(key, unescape_tag_value(value)),
            None => Tag::new(tag, String::new()),
        })
        .collect()
}

/// Unescape a tag value from wire format.
///
/// `\:` `\s` `\\` `\r` `\n` map back to `;`, space, backslash, CR and
/// LF. An unknown escape keeps the escaped character and a trailing lone
/// backslash is dropped.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}
