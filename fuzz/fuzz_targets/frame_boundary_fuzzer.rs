//! Fuzz target for frame header boundary conditions
//!
//! # Strategy
//!
//! - Length field: zero, below the type field, exact, at max, just over
//!   max, `u32::MAX`, random
//! - Message type: command, other, random
//! - Payload: arbitrary bytes, with or without the trailing NUL
//!
//! # Invariants
//!
//! - `length > MAX_FRAME_LEN` MUST return `ProtocolError::FrameTooLarge`
//!   before any payload is buffered
//! - `length` below the fixed overhead MUST return
//!   `ProtocolError::LengthTooSmall`
//! - A frame that decodes re-encodes to the same bytes when the payload was
//!   valid UTF-8 ending in NUL

#![no_main]

use arbitrary::Arbitrary;
use civ7_proto::{
    Frame, HEADER_SIZE, LENGTH_INCLUDES_TYPE_FIELD, MAX_FRAME_LEN, MESSAGE_TYPE_COMMAND,
    ProtocolError, TYPE_FIELD_SIZE,
};

/// Bytes `length` counts besides the body.
const OVERHEAD: usize = if LENGTH_INCLUDES_TYPE_FIELD { TYPE_FIELD_SIZE } else { 0 };
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct BoundaryFrame {
    length: LengthField,
    message_type: MessageType,
    payload: Vec<u8>,
    terminate: bool,
}

#[derive(Debug, Clone, Arbitrary)]
enum LengthField {
    Zero,
    BelowMinimum(u8),
    Exact,
    AtMax,
    JustOverMax,
    MaxU32,
    Random(u32),
}

#[derive(Debug, Clone, Arbitrary)]
enum MessageType {
    Command,
    Random(u32),
}

fuzz_target!(|boundary: BoundaryFrame| {
    let mut body = boundary.payload.clone();
    if boundary.terminate {
        body.push(0);
    }

    let exact = (OVERHEAD + body.len()) as u32;
    let length = match boundary.length {
        LengthField::Zero => 0,
        LengthField::BelowMinimum(n) => u32::from(n) % (OVERHEAD as u32 + 1),
        LengthField::Exact => exact,
        LengthField::AtMax => MAX_FRAME_LEN,
        LengthField::JustOverMax => MAX_FRAME_LEN + 1,
        LengthField::MaxU32 => u32::MAX,
        LengthField::Random(r) => r,
    };

    let message_type = match boundary.message_type {
        MessageType::Command => MESSAGE_TYPE_COMMAND,
        MessageType::Random(r) => r,
    };

    let mut wire = Vec::with_capacity(HEADER_SIZE + body.len());
    wire.extend_from_slice(&length.to_le_bytes());
    wire.extend_from_slice(&message_type.to_le_bytes());
    wire.extend_from_slice(&body);

    match Frame::decode(&wire) {
        Ok(Some((frame, consumed))) => {
            assert!(length <= MAX_FRAME_LEN);
            assert!(length as usize >= OVERHEAD);
            assert_eq!(consumed, HEADER_SIZE + length as usize - OVERHEAD);
            assert_eq!(frame.message_type, message_type);

            if length == exact && boundary.terminate {
                let bytes = frame.to_bytes().unwrap();
                assert_eq!(&bytes[..], &wire[..]);
            }
        },
        Ok(None) => {
            assert!(length <= MAX_FRAME_LEN);
            assert!(HEADER_SIZE + length as usize - OVERHEAD > wire.len());
        },
        Err(ProtocolError::FrameTooLarge { .. }) => assert!(length > MAX_FRAME_LEN),
        Err(ProtocolError::LengthTooSmall { .. }) => assert!((length as usize) < OVERHEAD),
        Err(_) => {},
    }
});
