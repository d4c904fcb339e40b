//! Channel name utilities.
//!
//! # Reference
//! - RFC 2812 Section 1.3: Channel names

/// Membership prefixes a server may put in front of a nickname in
/// RPL_NAMREPLY (`~&@%+`).
pub const MEMBERSHIP_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// Extension trait for checking if a string is a valid IRC channel name.
pub trait ChannelExt {
    /// Check if this string is a valid IRC channel name.
    ///
    /// Valid channel names start with `#`, `&`, `+` or `!`, contain no
    /// space, comma or control character and are at most 50 characters.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        let mut chars = self.chars();

        if !matches!(chars.next(), Some('#' | '&' | '+' | '!')) {
            return false;
        }

        self.chars().count() <= 50 && chars.all(|c| c != ' ' && c != ',' && !c.is_control())
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}

/// Strip RPL_NAMREPLY membership prefixes from a nickname.
///
/// ```
/// use slirc_proto::chan::strip_membership_prefix;
///
/// assert_eq!(strip_membership_prefix("@+alice"), "alice");
/// assert_eq!(strip_membership_prefix("bob"), "bob");
/// ```
pub fn strip_membership_prefix(name: &str) -> &str {
    name.trim_start_matches(MEMBERSHIP_PREFIXES)
}
