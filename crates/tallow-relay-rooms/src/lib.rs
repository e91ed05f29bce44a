//! Short-lived, two-peer rendezvous rooms: the word-code room directory
//! and the bidirectional byte bridge between a room's two peers.

mod bridge;
mod err;
mod room;
mod wordlist;

pub use bridge::{run_bridge, BridgeConfig, BridgeEndReason, BridgeOutcome, LinkClosed, PeerEvent, PeerLink};
pub use err::RoomError;
pub use room::{
    CreatedRoom, JoinedRoom, PeerRole, RoomManager, RoomManagerConfig, RoomManagerStats,
};
pub use wordlist::WORDLIST;
