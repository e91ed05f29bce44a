//! Errors produced while encoding or decoding wire formats.

use thiserror::Error;

/// Errors that can occur while parsing or building a frame or message.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum WireError {
    /// The frame's declared length exceeds the configured maximum.
    #[error("frame_too_large: {declared} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Length the peer declared in the frame header.
        declared: u32,
        /// The configured maximum frame size.
        limit: u32,
    },

    /// Fewer bytes were available than the format requires.
    #[error("truncated frame: expected at least {needed} bytes, had {available}")]
    Truncated {
        /// Bytes required to continue parsing.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// The frame type byte did not match any known variant.
    #[error("unknown frame type byte: {0:#04x}")]
    UnknownFrameType(u8),

    /// The onion frame type byte did not match any known variant.
    #[error("unknown onion frame type byte: {0:#04x}")]
    UnknownOnionFrameType(u8),

    /// A control message carried an unrecognized `type` string.
    #[error("unknown control message type: {0}")]
    UnknownMessageType(String),

    /// A control error payload carried an unrecognized error code.
    #[error("unknown control error code: {0}")]
    UnknownErrorCode(String),

    /// The JSON control payload failed to parse.
    #[error("invalid control payload: {0}")]
    InvalidJson(String),

    /// A circuit id exceeded the 8-bit length prefix used in onion frames.
    #[error("circuit id too long: {0} bytes")]
    CircuitIdTooLong(usize),
}
