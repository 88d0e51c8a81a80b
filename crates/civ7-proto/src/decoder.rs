//! Stream reassembly.
//!
//! TCP delivers bytes, not frames. [`FrameDecoder`] accumulates whatever the
//! socket hands over and yields complete frames in order.

use bytes::{Buf, BytesMut};

use crate::{Frame, Result};

/// Initial buffer capacity. Results are usually a few hundred bytes.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Accumulating decoder for a byte stream.
///
/// Feed bytes with [`FrameDecoder::extend`], then drain with
/// [`FrameDecoder::next_frame`] until it returns `Ok(None)`.
///
/// After an error the buffered bytes are meaningless; the owner is expected
/// to drop the connection and start over with [`FrameDecoder::clear`] or a
/// fresh decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self { buf: BytesMut::with_capacity(INITIAL_CAPACITY) }
    }

    /// Append bytes read from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Mutable access to the buffer for `read_buf`-style transports.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Pop the next complete frame, if any.
    ///
    /// Bytes of a frame are consumed only once the whole frame is present.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match Frame::decode(&self.buf)? {
            Some((frame, consumed)) => {
                self.buf.advance(consumed);
                Ok(Some(frame))
            },
            None => Ok(None),
        }
    }

    /// Number of bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolError;

    fn wire(text: &str) -> Vec<u8> {
        Frame::result(text).to_bytes().unwrap().to_vec()
    }

    #[test]
    fn byte_at_a_time() {
        let bytes = wire("Hello, World!");
        let mut decoder = FrameDecoder::new();

        for (i, byte) in bytes.iter().enumerate() {
            decoder.extend(std::slice::from_ref(byte));
            let frame = decoder.next_frame().unwrap();
            if i + 1 < bytes.len() {
                assert!(frame.is_none());
            } else {
                assert_eq!(frame.unwrap().payload, "Hello, World!");
            }
        }

        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn several_frames_in_one_read() {
        let mut bytes = wire("one");
        bytes.extend(wire("two"));
        bytes.extend(wire("three"));

        let mut decoder = FrameDecoder::new();
        decoder.extend(&bytes);

        let mut seen = Vec::new();
        while let Some(frame) = decoder.next_frame().unwrap() {
            seen.push(frame.payload);
        }

        assert_eq!(seen, vec!["one", "two", "three"]);
    }

    #[test]
    fn partial_tail_stays_buffered() {
        let mut bytes = wire("first");
        let second = wire("second");
        bytes.extend_from_slice(&second[..5]);

        let mut decoder = FrameDecoder::new();
        decoder.extend(&bytes);

        assert_eq!(decoder.next_frame().unwrap().unwrap().payload, "first");
        assert!(decoder.next_frame().unwrap().is_none());
        assert_eq!(decoder.buffered(), 5);

        decoder.extend(&second[5..]);
        assert_eq!(decoder.next_frame().unwrap().unwrap().payload, "second");
    }

    #[test]
    fn garbage_length_surfaces_error() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(b"this is not a frame header");

        assert!(matches!(decoder.next_frame(), Err(ProtocolError::FrameTooLarge { .. })));

        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }
}
