//! Fuzz target for server line parsing
//!
//! Feeds arbitrary UTF-8 to the parser; neither the lenient nor the
//! strict entry point may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if input.len() > slirc_proto::MAX_IRC_LINE_LEN {
            return;
        }

        let msg = slirc_proto::Message::parse(input);
        if msg.is_routable() {
            let _ = msg.response_target();
        }

        let _ = input.parse::<slirc_proto::Message>();
    }
});
