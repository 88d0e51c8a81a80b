//! Fuzz target for frame decoding
//!
//! Feeds arbitrary bytes to `Frame::decode` and to a `FrameDecoder` in
//! arbitrary chunk sizes.
//!
//! # Invariants
//!
//! - Never panics; malformed input is an error
//! - A decoded frame never claims more bytes than it was given
//! - Chunking does not change what the stream decoder yields

#![no_main]

use arbitrary::Arbitrary;
use civ7_proto::{Frame, FrameDecoder, HEADER_SIZE};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    bytes: Vec<u8>,
    chunk: u8,
}

/// Drain every frame the decoder can produce, stopping at the first error.
fn drain(decoder: &mut FrameDecoder, out: &mut Vec<Frame>) -> bool {
    loop {
        match decoder.next_frame() {
            Ok(Some(frame)) => out.push(frame),
            Ok(None) => return true,
            Err(_) => return false,
        }
    }
}

fuzz_target!(|input: Input| {
    if let Ok(Some((frame, consumed))) = Frame::decode(&input.bytes) {
        assert!(consumed >= HEADER_SIZE);
        assert!(consumed <= input.bytes.len());
        // The trailing NUL is optional on input but always written.
        assert!(frame.encoded_len() >= consumed);
    }

    let mut whole = FrameDecoder::new();
    whole.extend(&input.bytes);
    let mut expected = Vec::new();
    let whole_ok = drain(&mut whole, &mut expected);

    let chunk = usize::from(input.chunk.max(1));
    let mut split = FrameDecoder::new();
    let mut actual = Vec::new();
    let mut split_ok = true;
    for piece in input.bytes.chunks(chunk) {
        split.extend(piece);
        if !drain(&mut split, &mut actual) {
            split_ok = false;
            break;
        }
    }

    assert_eq!(whole_ok, split_ok);
    assert_eq!(expected, actual);
});
