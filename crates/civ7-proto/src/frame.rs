//! Frame type and the pure encode/decode functions.
//!
//! A `Frame` is the unit on the wire:
//! - 8-byte header: `length` (u32 LE) and `message_type` (u32 LE)
//! - UTF-8 payload
//! - single NUL terminator
//!
//! Decoding never consumes a partial frame. When the buffer holds less than a
//! full frame, [`Frame::decode`] returns `Ok(None)` and the caller keeps the
//! bytes until more arrive.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    COMMAND_PREFIX, HEADER_SIZE, LENGTH_INCLUDES_TYPE_FIELD, MAX_FRAME_LEN, MESSAGE_TYPE_COMMAND,
    TYPE_FIELD_SIZE,
    errors::{ProtocolError, Result},
};

/// Bytes of the length field that do not belong to the payload body.
const fn length_overhead() -> usize {
    if LENGTH_INCLUDES_TYPE_FIELD { TYPE_FIELD_SIZE } else { 0 }
}

/// One decoded protocol message.
///
/// # Invariants
///
/// - `payload` never contains the trailing NUL; [`Frame::encode`] appends it
///   and [`Frame::decode`] strips it.
/// - The `length` field is derived, never stored, so a `Frame` cannot disagree
///   with its own header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type (always [`MESSAGE_TYPE_COMMAND`] for command traffic)
    pub message_type: u32,

    /// Payload text without the NUL terminator
    pub payload: String,
}

impl Frame {
    /// Create a frame with an explicit message type.
    pub fn new(message_type: u32, payload: impl Into<String>) -> Self {
        Self { message_type, payload: payload.into() }
    }

    /// Outbound command frame: `CMD:65535:{script}`.
    pub fn command(script: &str) -> Self {
        Self::new(MESSAGE_TYPE_COMMAND, format!("{COMMAND_PREFIX}{script}"))
    }

    /// Inbound result frame carrying bare result text.
    pub fn result(text: impl Into<String>) -> Self {
        Self::new(MESSAGE_TYPE_COMMAND, text)
    }

    /// Script text of a command frame. `None` if the prefix is missing.
    pub fn script(&self) -> Option<&str> {
        self.payload.strip_prefix(COMMAND_PREFIX)
    }

    /// Whether this frame belongs to command/result traffic.
    pub fn is_command_traffic(&self) -> bool {
        self.message_type == MESSAGE_TYPE_COMMAND
    }

    /// Total bytes this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + 1
    }

    /// Value written into the `length` field.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the frame would exceed
    ///   [`MAX_FRAME_LEN`]
    pub fn length_field(&self) -> Result<u32> {
        let max_payload = MAX_FRAME_LEN as usize - length_overhead() - 1;
        if self.payload.len() > max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: max_payload,
            });
        }

        // Bounded by MAX_FRAME_LEN above.
        Ok((length_overhead() + self.payload.len() + 1) as u32)
    }

    /// Encode the frame into `dst`.
    ///
    /// Writes `[length][message_type][payload][NUL]`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload does not fit
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let length = self.length_field()?;

        dst.put_u32_le(length);
        dst.put_u32_le(self.message_type);
        dst.put_slice(self.payload.as_bytes());
        dst.put_u8(0);

        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Parse one frame from the front of `bytes`.
    ///
    /// Returns the frame and the number of bytes it occupied, or `Ok(None)`
    /// when `bytes` does not yet hold a complete frame. Trailing bytes after
    /// the frame are left alone.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooLarge` if `length` exceeds [`MAX_FRAME_LEN`]
    /// - `ProtocolError::LengthTooSmall` if `length` cannot cover the type
    ///   field (only when [`LENGTH_INCLUDES_TYPE_FIELD`] is set)
    /// - `ProtocolError::InvalidUtf8` if the payload is not UTF-8
    ///
    /// Size checks run on the header alone, before waiting for (or copying)
    /// the body, so a garbage length is rejected immediately.
    pub fn decode(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut header = &bytes[..HEADER_SIZE];
        let length = header.get_u32_le();
        let message_type = header.get_u32_le();

        if length > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge { length, max: MAX_FRAME_LEN });
        }

        let body_len = (length as usize)
            .checked_sub(length_overhead())
            .ok_or(ProtocolError::LengthTooSmall { length })?;
        let total = HEADER_SIZE + body_len;

        let Some(body) = bytes.get(HEADER_SIZE..total) else {
            return Ok(None);
        };

        let text = match body.split_last() {
            Some((0, rest)) => rest,
            _ => body,
        };

        let payload =
            std::str::from_utf8(text).map_err(|e| ProtocolError::InvalidUtf8(e.to_string()))?;

        Ok(Some((Self::new(message_type, payload), total)))
    }
}

/// Encode a script as an outbound command frame.
pub fn encode_command(script: &str) -> Result<Bytes> {
    Frame::command(script).to_bytes()
}

/// Parse one frame from the front of `buffer`. See [`Frame::decode`].
pub fn decode(buffer: &[u8]) -> Result<Option<(Frame, usize)>> {
    Frame::decode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_layout() {
        let wire = encode_command("1+1").unwrap();

        // "CMD:65535:1+1" is 13 bytes, plus NUL.
        let mut expected = Vec::new();
        expected.extend_from_slice(&14u32.to_le_bytes());
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(b"CMD:65535:1+1\0");

        assert_eq!(wire.as_ref(), expected.as_slice());
    }

    #[test]
    fn decode_strips_terminator() {
        let wire = Frame::result("2").to_bytes().unwrap();
        let (frame, consumed) = Frame::decode(&wire).unwrap().unwrap();

        assert_eq!(frame.payload, "2");
        assert_eq!(frame.message_type, MESSAGE_TYPE_COMMAND);
        assert_eq!(consumed, wire.len());
    }

    #[test]
    fn decode_short_header_needs_more() {
        let wire = Frame::result("hello").to_bytes().unwrap();
        for cut in 0..HEADER_SIZE {
            assert_eq!(Frame::decode(&wire[..cut]), Ok(None));
        }
    }

    #[test]
    fn decode_partial_body_needs_more() {
        let wire = Frame::result("hello").to_bytes().unwrap();
        assert_eq!(Frame::decode(&wire[..wire.len() - 1]), Ok(None));
    }

    #[test]
    fn decode_leaves_trailing_bytes() {
        let mut wire = Frame::result("a").to_bytes().unwrap().to_vec();
        let first_len = wire.len();
        wire.extend_from_slice(&Frame::result("b").to_bytes().unwrap());

        let (frame, consumed) = Frame::decode(&wire).unwrap().unwrap();
        assert_eq!(frame.payload, "a");
        assert_eq!(consumed, first_len);

        let (frame, _) = Frame::decode(&wire[consumed..]).unwrap().unwrap();
        assert_eq!(frame.payload, "b");
    }

    #[test]
    fn reject_oversized_length() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
        wire.extend_from_slice(&3u32.to_le_bytes());

        let result = Frame::decode(&wire);
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn length_counts_payload_and_terminator_only() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&12u32.to_le_bytes());
        wire.extend_from_slice(&3u32.to_le_bytes());
        wire.extend_from_slice(b"hello world\0");
        wire.extend_from_slice(b"next");

        let (frame, consumed) = Frame::decode(&wire).unwrap().unwrap();
        assert_eq!(frame.payload, "hello world");
        assert_eq!(consumed, HEADER_SIZE + 12);
    }

    #[test]
    fn short_result_decodes_whole() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&2u32.to_le_bytes());
        wire.extend_from_slice(&3u32.to_le_bytes());
        wire.extend_from_slice(b"2\0");

        let (frame, consumed) = Frame::decode(&wire).unwrap().unwrap();
        assert_eq!(frame.payload, "2");
        assert_eq!(consumed, wire.len());
    }

    #[test]
    fn missing_terminator_is_tolerated() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&2u32.to_le_bytes());
        wire.extend_from_slice(&3u32.to_le_bytes());
        wire.extend_from_slice(b"ok");

        let (frame, consumed) = Frame::decode(&wire).unwrap().unwrap();
        assert_eq!(frame.payload, "ok");
        assert_eq!(consumed, 10);
    }

    #[test]
    fn empty_body_decodes_to_empty_payload() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&0u32.to_le_bytes());
        wire.extend_from_slice(&3u32.to_le_bytes());

        let (frame, consumed) = Frame::decode(&wire).unwrap().unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(consumed, HEADER_SIZE);
    }

    #[test]
    fn reject_invalid_utf8() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&3u32.to_le_bytes());
        wire.extend_from_slice(&3u32.to_le_bytes());
        wire.extend_from_slice(&[0xff, 0xfe, 0]);

        let result = Frame::decode(&wire);
        assert!(matches!(result, Err(ProtocolError::InvalidUtf8(_))));
    }

    #[test]
    fn script_round_trips_through_command_prefix() {
        let frame = Frame::command("Players.getAliveMajorIds()");
        assert_eq!(frame.script(), Some("Players.getAliveMajorIds()"));
        assert_eq!(Frame::result("2").script(), None);
    }

    #[test]
    fn reject_oversized_payload_on_encode() {
        let frame = Frame::result("x".repeat(MAX_FRAME_LEN as usize));
        let mut buf = Vec::new();
        assert!(matches!(frame.encode(&mut buf), Err(ProtocolError::PayloadTooLarge { .. })));
        assert!(buf.is_empty());
    }
}
