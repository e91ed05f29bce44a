//! The JSON control-message schema carried inside [`crate::frame::FrameType::Control`] frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` discriminant of a [`ControlMessage`].
///
/// Serialized as the exact uppercase strings in the wire contract; the
/// schema's field names are API-critical and must not be renamed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "CREATE_ROOM")]
    CreateRoom,
    #[serde(rename = "ROOM_CREATED")]
    RoomCreated,
    #[serde(rename = "JOIN_ROOM")]
    JoinRoom,
    #[serde(rename = "ROOM_JOINED")]
    RoomJoined,
    #[serde(rename = "PEER_JOINED")]
    PeerJoined,
    #[serde(rename = "PEER_LEFT")]
    PeerLeft,
    #[serde(rename = "CLOSE")]
    Close,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "PONG")]
    Pong,
    #[serde(rename = "DATA")]
    Data,
    #[serde(rename = "SIGNAL")]
    Signal,
    #[serde(rename = "PAKE")]
    Pake,
    #[serde(rename = "ENCRYPT")]
    Encrypt,
}

/// Error codes carried in an `ERROR` control message's payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "UNKNOWN_ERROR")]
    UnknownError,
    #[serde(rename = "ROOM_NOT_FOUND")]
    RoomNotFound,
    #[serde(rename = "ROOM_FULL")]
    RoomFull,
    #[serde(rename = "ROOM_EXPIRED")]
    RoomExpired,
    #[serde(rename = "RATE_LIMITED")]
    RateLimited,
    #[serde(rename = "INVALID_MESSAGE")]
    InvalidMessage,
    #[serde(rename = "HANDSHAKE_FAILED")]
    HandshakeFailed,
    #[serde(rename = "TRANSFER_FAILED")]
    TransferFailed,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "MAX_ROOMS_REACHED")]
    MaxRoomsReached,
}

/// The body of an `ERROR` control message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// The machine-readable error code.
    pub code: ErrorCode,
    /// A human-readable message, safe to display to the peer.
    pub message: String,
    /// Optional structured detail; never contains payload bytes from the
    /// triggering request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorPayload {
    /// Build an error payload with no extra detail.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
}

/// A control-channel message: `{type, payload, ts}`.
///
/// `payload` is intentionally opaque (`serde_json::Value`) at this layer;
/// callers parse it into a concrete type once they know `message_type`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: Value,
    pub ts: i64,
}

impl ControlMessage {
    /// Build a new control message, serializing `payload` to JSON.
    ///
    /// `now_millis` is passed in rather than sampled internally so that
    /// callers control the time source (and so this type stays free of
    /// hidden wall-clock reads, which would otherwise make the codec
    /// non-deterministic to test).
    pub fn new<T: Serialize>(
        message_type: MessageType,
        payload: &T,
        now_millis: i64,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            message_type,
            payload: serde_json::to_value(payload)?,
            ts: now_millis,
        })
    }

    /// Build an `ERROR` control message.
    pub fn error(code: ErrorCode, message: impl Into<String>, now_millis: i64) -> Self {
        let payload = ErrorPayload::new(code, message);
        Self {
            message_type: MessageType::Error,
            // `ErrorPayload` always serializes; unwrap is safe.
            payload: serde_json::to_value(payload).expect("ErrorPayload always serializes"),
            ts: now_millis,
        }
    }

    /// Parse `self.payload` into a concrete type `T`.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.payload.clone())
    }

    /// Serialize this message to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a control message from a JSON string.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize as _;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct CreateRoomPayload {
        expiry_minutes: u32,
    }

    #[test]
    fn new_message_round_trips_through_parse_payload() {
        let payload = CreateRoomPayload { expiry_minutes: 30 };
        let msg = ControlMessage::new(MessageType::CreateRoom, &payload, 1_700_000_000_000).unwrap();
        let parsed: CreateRoomPayload = msg.parse_payload().unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn json_round_trip_preserves_message_type() {
        let msg = ControlMessage::error(ErrorCode::RoomNotFound, "no such room", 42);
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"ROOM_NOT_FOUND\""));
        let parsed = ControlMessage::from_json(&json).unwrap();
        assert_eq!(parsed.message_type, MessageType::Error);
        assert_eq!(parsed.ts, 42);
    }

    #[test]
    fn message_type_uses_contract_strings() {
        let json = serde_json::to_string(&MessageType::RoomJoined).unwrap();
        assert_eq!(json, "\"ROOM_JOINED\"");
    }
}
