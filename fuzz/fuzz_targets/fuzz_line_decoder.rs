//! Fuzz target: `LineDecoder::feed_byte`
//!
//! Drives arbitrary serial bytes through the telemetry line decoder and
//! asserts that it never panics, never yields a line longer than its
//! buffer, and never yields a terminator inside a line.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use roombridge::serial::{LineDecoder, MAX_LINE_LEN};

fuzz_target!(|data: &[u8]| {
    let mut decoder = LineDecoder::new();

    for &byte in data {
        if let Some(line) = decoder.feed_byte(byte) {
            assert!(line.len() <= MAX_LINE_LEN, "line exceeds buffer");
            assert!(!line.contains(&b'\n'), "terminator leaked into line");
        }
    }
    assert!(decoder.pending() < MAX_LINE_LEN);

    decoder.reset();
    assert_eq!(decoder.pending(), 0);
});
