//! Civ7 debug port wire protocol.
//!
//! The game exposes a plaintext TCP port (`FireTuner`) that accepts script text
//! and answers with the textual result. Every message on the wire is a frame:
//!
//! ```text
//! [u32 LE length][u32 LE message type][payload bytes][NUL]
//! ```
//!
//! where `length` counts the payload bytes and the NUL, not the type field
//! in front of them. Outbound
//! command payloads carry a fixed `CMD:65535:` prefix; inbound results carry
//! the bare result text.
//!
//! This crate is pure: no sockets, no clocks. [`Frame::decode`] parses one
//! frame from the front of a buffer, and [`FrameDecoder`] owns an
//! accumulation buffer for stream transports.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod decoder;
pub mod errors;
mod frame;

pub use decoder::FrameDecoder;
pub use errors::{ProtocolError, Result};
pub use frame::{Frame, decode, encode_command};

/// Message type used for all command and result traffic.
pub const MESSAGE_TYPE_COMMAND: u32 = 3;

/// Prefix the debug port expects in front of every script.
pub const COMMAND_PREFIX: &str = "CMD:65535:";

/// Size of the fixed header: length field plus message type field.
pub const HEADER_SIZE: usize = 8;

/// Size of the message type field.
pub const TYPE_FIELD_SIZE: usize = 4;

/// Whether the `length` field counts the 4-byte message type field.
///
/// The game writes `length = payload + NUL` and reads exactly `length` bytes
/// after the 8-byte header.
pub const LENGTH_INCLUDES_TYPE_FIELD: bool = false;

/// Upper bound on the `length` field (16 MiB).
///
/// A desynchronized stream tends to read text as a huge length; rejecting it
/// here turns that into a [`ProtocolError`] instead of an unbounded buffer.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;
