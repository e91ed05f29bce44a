//! Wire formats shared by every Tallow relay role: the binary
//! relay-to-relay frame, the JSON control-message schema it carries for
//! rendezvous rooms, and the client-to-relay onion message frame.
//!
//! The frame header layouts and onion message type numbers in this crate
//! are compatibility-critical; changing them breaks interoperability with
//! already-deployed relays and clients.

mod control;
mod err;
mod frame;
mod onion;

pub use control::{ControlMessage, ErrorCode, ErrorPayload, MessageType};
pub use err::WireError;
pub use frame::{Frame, FrameType, DEFAULT_MAX_FRAME_SIZE};
pub use onion::{OnionFrame, OnionFrameType, DEFAULT_MAX_ONION_MESSAGE_SIZE};
