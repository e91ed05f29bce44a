//! The client-to-relay onion message frame format.
//!
//! Layout:
//! `type:u8 | request_id:u32-be | circuit_id_len:u8 | circuit_id[len] | payload_len:u32-be | payload[payload_len]`

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::err::WireError;

/// Default ceiling on an onion frame's payload.
pub const DEFAULT_MAX_ONION_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Onion frame type byte. Values are compatibility-critical.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum OnionFrameType {
    Hello,
    HelloResponse,
    CreateCircuit,
    CircuitCreated,
    ExtendCircuit,
    CircuitExtended,
    DestroyCircuit,
    RelayData,
    RelayAck,
    Heartbeat,
    HeartbeatAck,
    Error,
}

impl OnionFrameType {
    /// Return the wire byte for this frame type.
    pub const fn as_u8(self) -> u8 {
        match self {
            OnionFrameType::Hello => 0x01,
            OnionFrameType::HelloResponse => 0x02,
            OnionFrameType::CreateCircuit => 0x10,
            OnionFrameType::CircuitCreated => 0x11,
            OnionFrameType::ExtendCircuit => 0x12,
            OnionFrameType::CircuitExtended => 0x13,
            OnionFrameType::DestroyCircuit => 0x14,
            OnionFrameType::RelayData => 0x20,
            OnionFrameType::RelayAck => 0x21,
            OnionFrameType::Heartbeat => 0x30,
            OnionFrameType::HeartbeatAck => 0x31,
            OnionFrameType::Error => 0xFF,
        }
    }

    /// Parse a wire byte into an onion frame type.
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(OnionFrameType::Hello),
            0x02 => Some(OnionFrameType::HelloResponse),
            0x10 => Some(OnionFrameType::CreateCircuit),
            0x11 => Some(OnionFrameType::CircuitCreated),
            0x12 => Some(OnionFrameType::ExtendCircuit),
            0x13 => Some(OnionFrameType::CircuitExtended),
            0x14 => Some(OnionFrameType::DestroyCircuit),
            0x20 => Some(OnionFrameType::RelayData),
            0x21 => Some(OnionFrameType::RelayAck),
            0x30 => Some(OnionFrameType::Heartbeat),
            0x31 => Some(OnionFrameType::HeartbeatAck),
            0xFF => Some(OnionFrameType::Error),
            _ => None,
        }
    }
}

/// A single onion message frame exchanged between a client and a relay.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OnionFrame {
    /// The message type.
    pub frame_type: OnionFrameType,
    /// Caller-chosen id used to correlate a request with its response.
    pub request_id: u32,
    /// The target circuit, empty for pre-circuit messages like HELLO.
    pub circuit_id: Bytes,
    /// The (possibly AEAD-sealed) payload.
    pub payload: Bytes,
}

impl OnionFrame {
    /// Build a new onion frame.
    ///
    /// Fails if `circuit_id` does not fit in the 8-bit length prefix.
    pub fn new(
        frame_type: OnionFrameType,
        request_id: u32,
        circuit_id: impl Into<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Result<Self, WireError> {
        let circuit_id = circuit_id.into();
        if circuit_id.len() > u8::MAX as usize {
            return Err(WireError::CircuitIdTooLong(circuit_id.len()));
        }
        Ok(Self {
            frame_type,
            request_id,
            circuit_id,
            payload: payload.into(),
        })
    }

    /// Encode this frame onto `out`.
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), WireError> {
        if self.circuit_id.len() > u8::MAX as usize {
            return Err(WireError::CircuitIdTooLong(self.circuit_id.len()));
        }
        out.put_u8(self.frame_type.as_u8());
        out.put_u32(self.request_id);
        out.put_u8(self.circuit_id.len() as u8);
        out.extend_from_slice(&self.circuit_id);
        out.put_u32(self.payload.len() as u32);
        out.extend_from_slice(&self.payload);
        Ok(())
    }

    /// Encode this frame into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<BytesMut, WireError> {
        let mut out = BytesMut::with_capacity(10 + self.circuit_id.len() + self.payload.len());
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Decode a single onion frame from a buffer containing exactly one
    /// frame (e.g. a single WebSocket binary message).
    pub fn decode_exact(mut bytes: Bytes, max_payload_size: u32) -> Result<Self, WireError> {
        const FIXED: usize = 1 + 4 + 1;
        if bytes.len() < FIXED {
            return Err(WireError::Truncated {
                needed: FIXED,
                available: bytes.len(),
            });
        }
        let type_byte = bytes[0];
        let request_id = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let circuit_id_len = bytes[5] as usize;
        bytes.advance(FIXED);

        if bytes.len() < circuit_id_len + 4 {
            return Err(WireError::Truncated {
                needed: circuit_id_len + 4,
                available: bytes.len(),
            });
        }
        let circuit_id = bytes.split_to(circuit_id_len);

        let payload_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        bytes.advance(4);
        if payload_len > max_payload_size {
            return Err(WireError::FrameTooLarge {
                declared: payload_len,
                limit: max_payload_size,
            });
        }
        if bytes.len() < payload_len as usize {
            return Err(WireError::Truncated {
                needed: payload_len as usize,
                available: bytes.len(),
            });
        }
        let payload = bytes.split_to(payload_len as usize);

        let frame_type =
            OnionFrameType::from_u8(type_byte).ok_or(WireError::UnknownOnionFrameType(type_byte))?;

        Ok(OnionFrame {
            frame_type,
            request_id,
            circuit_id,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_bit_identical() {
        let frame = OnionFrame::new(
            OnionFrameType::RelayData,
            7,
            Bytes::from_static(b"0123456789abcdef0123456789abcdef"),
            Bytes::from_static(b"sealed-bytes"),
        )
        .unwrap();
        let encoded = frame.to_bytes().unwrap();
        let decoded = OnionFrame::decode_exact(encoded.clone().freeze(), DEFAULT_MAX_ONION_MESSAGE_SIZE).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.to_bytes().unwrap(), encoded);
    }

    #[test]
    fn hello_frame_has_empty_circuit_id() {
        let frame = OnionFrame::new(OnionFrameType::Hello, 1, Bytes::new(), Bytes::from_static(b"pk")).unwrap();
        let encoded = frame.to_bytes().unwrap();
        assert_eq!(encoded[5], 0);
    }

    #[test]
    fn oversize_payload_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(OnionFrameType::RelayData.as_u8());
        buf.put_u32(1);
        buf.put_u8(0);
        buf.put_u32(DEFAULT_MAX_ONION_MESSAGE_SIZE + 1);
        let err = OnionFrame::decode_exact(buf.freeze(), DEFAULT_MAX_ONION_MESSAGE_SIZE).unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }

    #[test]
    fn circuit_id_too_long_is_rejected_at_construction() {
        let huge = vec![0u8; 300];
        let err = OnionFrame::new(OnionFrameType::RelayData, 1, huge, Bytes::new()).unwrap_err();
        assert!(matches!(err, WireError::CircuitIdTooLong(300)));
    }
}
