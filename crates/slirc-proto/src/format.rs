//! IRC formatting control characters.
//!
//! Message content may carry formatting codes (bold, color, CTCP
//! delimiters, ...). Outbound lines must not carry other control
//! characters, and presentation layers usually want the codes removed.
//!
//! See <https://modern.ircdocs.horse/formatting>.

/// Color code; followed by up to two `fg[,bg]` digit groups.
const COLOR: char = '\x03';
/// Hex color code; followed by up to two `RRGGBB[,RRGGBB]` groups.
const HEX_COLOR: char = '\x04';

/// Returns true if the character is an IRC formatting code.
///
/// ```
/// use slirc_proto::format::is_irc_format_code;
///
/// assert!(is_irc_format_code('\x02')); // Bold
/// assert!(!is_irc_format_code('a'));
/// ```
#[inline]
pub fn is_irc_format_code(ch: char) -> bool {
    matches!(
        ch,
        '\x01' | '\x02' | '\x03' | '\x04' | '\x0F' | '\x11' | '\x16' | '\x1D' | '\x1E' | '\x1F'
    )
}

/// Returns true if a control character must not be sent in a line.
///
/// BEL is always illegal. Other control characters are illegal unless
/// they are CR, LF, NUL or a formatting code.
#[inline]
pub fn is_illegal_control_char(ch: char) -> bool {
    if ch == '\x07' {
        return true;
    }
    ch.is_control() && ch != '\r' && ch != '\n' && ch != '\0' && !is_irc_format_code(ch)
}

/// Remove formatting codes (including color arguments) from text.
///
/// ```
/// use slirc_proto::format::strip_formatting;
///
/// assert_eq!(strip_formatting("\x02bold\x02 \x0304,01red\x03 plain"), "bold red plain");
/// ```
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            COLOR => skip_color_args(&mut chars, 2, char::is_ascii_digit),
            HEX_COLOR => skip_color_args(&mut chars, 6, char::is_ascii_hexdigit),
            c if is_irc_format_code(c) => {}
            c => out.push(c),
        }
    }
    out
}

/// Skip `fg[,bg]` after a color code, each group at most `width` chars.
fn skip_color_args<I>(chars: &mut std::iter::Peekable<I>, width: usize, valid: fn(&char) -> bool)
where
    I: Iterator<Item = char> + Clone,
{
    let skip_group = |chars: &mut std::iter::Peekable<I>| {
        let mut taken = 0;
        while taken < width && chars.peek().is_some_and(valid) {
            chars.next();
            taken += 1;
        }
        taken
    };

    if skip_group(chars) == 0 {
        return;
    }
    if chars.peek() == Some(&',') {
        // Only consume the comma when a background group follows it.
        let mut lookahead = chars.clone();
        lookahead.next();
        if lookahead.peek().is_some_and(valid) {
            chars.next();
            skip_group(chars);
        }
    }
}
