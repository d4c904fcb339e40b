//! Fuzz target for the line codec
//!
//! Arbitrary bytes must decode into lines without an error, and every
//! decoded line must be free of terminators.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use slirc_proto::LineCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = LineCodec::with_max_len(512);
    let mut buf = BytesMut::from(data);

    while let Ok(Some(line)) = codec.decode(&mut buf) {
        assert!(!line.contains('\n'));
    }
    let _ = LineCodec::sanitize(&String::from_utf8_lossy(data));
});
