//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding frames.
///
/// Every decode error means the byte stream can no longer be trusted to line
/// up with frame boundaries. Callers must drop the connection and reconnect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// `length` field exceeds [`crate::MAX_FRAME_LEN`]
    #[error("frame too large: length field {length} exceeds {max}")]
    FrameTooLarge {
        /// Value read from the length field
        length: u32,
        /// Configured bound
        max: u32,
    },

    /// Outgoing payload does not fit in a frame
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Encoded payload size in bytes
        size: usize,
        /// Maximum payload size in bytes
        max: usize,
    },

    /// `length` field is smaller than the message type field it must cover
    #[error("length field {length} is smaller than the message type field")]
    LengthTooSmall {
        /// Value read from the length field
        length: u32,
    },

    /// Payload bytes are not UTF-8
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

impl ProtocolError {
    /// Returns true if this error means the stream lost frame alignment.
    ///
    /// Encode-side errors leave the stream untouched.
    pub fn is_desync(&self) -> bool {
        !matches!(self, Self::PayloadTooLarge { .. })
    }
}
