//! The relay-to-relay and relay-to-rendezvous-peer binary frame format.
//!
//! Layout: `type:u8 | length:u32-be | payload[length]`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::err::WireError;

/// Default ceiling on a single frame's payload, per the wire contract.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Fixed header size: one type byte plus a 4-byte big-endian length.
const HEADER_LEN: usize = 5;

/// The kind of payload a [`Frame`] carries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum FrameType {
    /// A JSON-encoded [`crate::control::ControlMessage`].
    Control,
    /// Opaque forwarded bytes (room bridge traffic, relayed circuit data).
    Data,
    /// Keepalive probe.
    Ping,
    /// Keepalive response.
    Pong,
}

impl FrameType {
    /// Return the wire byte for this frame type.
    pub const fn as_u8(self) -> u8 {
        match self {
            FrameType::Control => 0x01,
            FrameType::Data => 0x02,
            FrameType::Ping => 0x03,
            FrameType::Pong => 0x04,
        }
    }

    /// Parse a wire byte into a frame type.
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(FrameType::Control),
            0x02 => Some(FrameType::Data),
            0x03 => Some(FrameType::Ping),
            0x04 => Some(FrameType::Pong),
            _ => None,
        }
    }
}

/// A single length-prefixed binary frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// The frame's type.
    pub frame_type: FrameType,
    /// The frame's payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Build a new frame from a type and payload.
    pub fn new(frame_type: FrameType, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }

    /// Encode this frame onto `out`, appending to any existing contents.
    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.frame_type.as_u8());
        out.put_u32(self.payload.len() as u32);
        out.extend_from_slice(&self.payload);
    }

    /// Encode this frame into a freshly allocated buffer.
    pub fn to_bytes(&self) -> BytesMut {
        let mut out = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        self.encode(&mut out);
        out
    }

    /// Attempt to decode a single frame from the front of `buf`.
    ///
    /// On success, the consumed bytes are advanced out of `buf` and the
    /// parsed frame is returned. Returns `Ok(None)` if `buf` does not yet
    /// contain a complete frame (the caller should read more bytes and
    /// retry); this makes the function suitable for use as a
    /// `tokio_util::codec::Decoder`.
    pub fn decode(buf: &mut BytesMut, max_frame_size: u32) -> Result<Option<Frame>, WireError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let type_byte = buf[0];
        let declared_len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        if declared_len > max_frame_size {
            return Err(WireError::FrameTooLarge {
                declared: declared_len,
                limit: max_frame_size,
            });
        }
        let total_len = HEADER_LEN + declared_len as usize;
        if buf.len() < total_len {
            return Ok(None);
        }
        let frame_type = FrameType::from_u8(type_byte).ok_or(WireError::UnknownFrameType(type_byte))?;
        buf.advance(HEADER_LEN);
        let payload = buf.split_to(declared_len as usize).freeze();
        Ok(Some(Frame { frame_type, payload }))
    }

    /// Decode exactly one frame from a byte slice that contains exactly one
    /// frame's worth of bytes (no trailing or leading data). Useful in tests
    /// and for framed transports that already delimit messages (e.g. a
    /// WebSocket binary message carrying one frame per message).
    pub fn decode_exact(mut bytes: Bytes, max_frame_size: u32) -> Result<Frame, WireError> {
        if bytes.len() < HEADER_LEN {
            return Err(WireError::Truncated {
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        }
        let type_byte = bytes[0];
        let declared_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        if declared_len > max_frame_size {
            return Err(WireError::FrameTooLarge {
                declared: declared_len,
                limit: max_frame_size,
            });
        }
        bytes.advance(HEADER_LEN);
        if bytes.len() < declared_len as usize {
            return Err(WireError::Truncated {
                needed: declared_len as usize,
                available: bytes.len(),
            });
        }
        let frame_type = FrameType::from_u8(type_byte).ok_or(WireError::UnknownFrameType(type_byte))?;
        let payload = bytes.split_to(declared_len as usize);
        Ok(Frame { frame_type, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_bit_identical() {
        let frame = Frame::new(FrameType::Data, Bytes::from_static(b"hello world"));
        let encoded = frame.to_bytes();
        let decoded = Frame::decode_exact(encoded.clone().freeze(), DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(decoded, frame);

        let re_encoded = decoded.to_bytes();
        assert_eq!(re_encoded, encoded);
    }

    #[test]
    fn decode_waits_for_more_bytes() {
        let frame = Frame::new(FrameType::Ping, Bytes::from_static(b"abc"));
        let full = frame.to_bytes();

        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert_eq!(Frame::decode(&mut partial, DEFAULT_MAX_FRAME_SIZE).unwrap(), None);

        let mut complete = BytesMut::from(&full[..]);
        let decoded = Frame::decode(&mut complete, DEFAULT_MAX_FRAME_SIZE).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(complete.is_empty());
    }

    #[test]
    fn oversize_frame_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(FrameType::Data.as_u8());
        buf.put_u32(DEFAULT_MAX_FRAME_SIZE + 1);
        let err = Frame::decode(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }

    #[test]
    fn unknown_type_byte_errors() {
        let mut buf = BytesMut::new();
        buf.put_u8(0xEE);
        buf.put_u32(0);
        let err = Frame::decode(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap_err();
        assert_eq!(err, WireError::UnknownFrameType(0xEE));
    }
}
