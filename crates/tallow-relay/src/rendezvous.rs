//! The rendezvous relay's `/ws` surface: CREATE_ROOM / JOIN_ROOM, then a
//! bidirectional bridge between the two peers once both are present.
//!
//! Each peer's WebSocket lives entirely within its own connection task;
//! the two tasks never share a socket. [`RoomManager`]'s per-room mpsc
//! pair is the handoff point: each task bridges its own real WebSocket
//! against a [`ChannelLink`] that represents "the other peer", and the
//! room manager wires those channels together.
//!
//! Every message crossing the wire, both the JSON control envelope and
//! bridged transfer bytes, travels inside a [`Frame`]: control traffic
//! uses `FrameType::Control`, bridged payloads use `FrameType::Data`.
//! Once a room's bridge is running, any control message the relay does
//! not itself interpret (`SIGNAL`, `PAKE`, `ENCRYPT`, `DATA`) is forwarded
//! to the other peer verbatim, frame and all.

use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use tallow_relay_rooms::{run_bridge, BridgeEndReason, LinkClosed, PeerEvent, PeerLink, PeerRole, RoomError};
use tallow_relay_wire::{ControlMessage, ErrorCode, Frame, FrameType, MessageType, DEFAULT_MAX_FRAME_SIZE};

use crate::state::RendezvousState;

pub fn router(state: RendezvousState) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .route("/api/v1/rooms", get(rooms_summary))
        .route("/api/v1/stats", get(stats))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
}

#[derive(Serialize)]
struct RoomsSummary {
    active_rooms: usize,
}

async fn rooms_summary(State(state): State<RendezvousState>) -> impl IntoResponse {
    let stats = state.rooms.stats().await;
    Json(RoomsSummary { active_rooms: stats.active_rooms })
}

#[derive(Serialize)]
struct StatsSummary {
    active_rooms: usize,
    rooms_created_total: u64,
    rooms_expired_total: u64,
    active_connections: i64,
}

async fn stats(State(state): State<RendezvousState>) -> impl IntoResponse {
    let room_stats = state.rooms.stats().await;
    Json(StatsSummary {
        active_rooms: room_stats.active_rooms,
        rooms_created_total: state.metrics.rooms_created_total.get(),
        rooms_expired_total: state.metrics.rooms_expired_total.get(),
        active_connections: state.metrics.active_connections.get(),
    })
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn ready() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ready" })))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<RendezvousState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: RendezvousState) {
    state.metrics.active_connections.inc();
    let (mut write, mut read) = socket.split();

    let first = match read.next().await {
        Some(Ok(Message::Binary(b))) => Bytes::from(b),
        _ => {
            state.metrics.active_connections.dec();
            return;
        }
    };

    let frame = match Frame::decode_exact(first, DEFAULT_MAX_FRAME_SIZE) {
        Ok(f) if f.frame_type == FrameType::Control => f,
        _ => {
            send_error(&mut write, ErrorCode::InvalidMessage, "expected a control frame").await;
            state.metrics.active_connections.dec();
            return;
        }
    };

    let text = String::from_utf8_lossy(&frame.payload).into_owned();
    let msg = match ControlMessage::from_json(&text) {
        Ok(m) => m,
        Err(_) => {
            send_error(&mut write, ErrorCode::InvalidMessage, "malformed control message").await;
            state.metrics.active_connections.dec();
            return;
        }
    };

    match msg.message_type {
        MessageType::CreateRoom => handle_create_room(write, read, msg, &state).await,
        MessageType::JoinRoom => handle_join_room(write, read, msg, &state).await,
        _ => {
            send_error(&mut write, ErrorCode::HandshakeFailed, "connection must open with CREATE_ROOM or JOIN_ROOM").await;
        }
    }
    state.metrics.active_connections.dec();
}

#[derive(Serialize, Deserialize)]
struct CreateRoomPayload {
    #[serde(default)]
    expiry_secs: Option<u64>,
}

#[derive(Serialize)]
struct RoomCreatedPayload {
    room_id: String,
    code: String,
    expires_in_secs: u64,
}

#[derive(Serialize, Deserialize)]
struct JoinRoomPayload {
    code: String,
}

#[derive(Serialize)]
struct RoomJoinedPayload {
    room_id: String,
}

#[derive(Serialize)]
struct PeerJoinedPayload {
    room_id: String,
}

async fn handle_create_room(
    mut write: SplitSink<WebSocket, Message>,
    mut read: SplitStream<WebSocket>,
    msg: ControlMessage,
    state: &RendezvousState,
) {
    let requested: CreateRoomPayload = msg.parse_payload().unwrap_or(CreateRoomPayload { expiry_secs: None });
    let ttl = requested.expiry_secs.map(std::time::Duration::from_secs);

    let created = match state.rooms.create_room(ttl).await {
        Ok(c) => c,
        Err(e) => {
            send_error(&mut write, room_error_code(&e), &e.to_string()).await;
            return;
        }
    };
    state.metrics.rooms_created_total.inc();
    state.metrics.rooms_active.inc();

    let remaining = created.expires_at.saturating_duration_since(tokio::time::Instant::now()).as_secs();
    if !reply(
        &mut write,
        MessageType::RoomCreated,
        &RoomCreatedPayload {
            room_id: created.room_id.clone(),
            code: created.code.clone(),
            expires_in_secs: remaining,
        },
    )
    .await
    {
        state.rooms.close_room(&created.room_id).await;
        state.metrics.rooms_active.dec();
        return;
    }

    let room_id = created.room_id.clone();
    let joined_before_timeout = tokio::select! {
        _ = created.peer_joined.notified() => true,
        _ = created.closed.notified() => false,
        _ = tokio::time::sleep_until(created.expires_at) => false,
        r = read.next() => { let _ = r; false }
    };

    if !joined_before_timeout {
        state.rooms.close_room(&room_id).await;
        state.metrics.rooms_active.dec();
        return;
    }

    if !reply(&mut write, MessageType::PeerJoined, &PeerJoinedPayload { room_id: room_id.clone() }).await {
        state.rooms.close_room(&room_id).await;
        state.metrics.rooms_active.dec();
        return;
    }

    let Some(to_joiner) = state.rooms.sender_to(&room_id, PeerRole::Joiner).await else {
        state.rooms.close_room(&room_id).await;
        state.metrics.rooms_active.dec();
        return;
    };

    run_and_close(state, &room_id, write, read, created.rx, to_joiner).await;
}

async fn handle_join_room(
    mut write: SplitSink<WebSocket, Message>,
    read: SplitStream<WebSocket>,
    msg: ControlMessage,
    state: &RendezvousState,
) {
    let payload: JoinRoomPayload = match msg.parse_payload() {
        Ok(p) => p,
        Err(_) => {
            send_error(&mut write, ErrorCode::InvalidMessage, "missing room code").await;
            return;
        }
    };

    let joined = match state.rooms.join_room(&payload.code).await {
        Ok(j) => j,
        Err(e) => {
            send_error(&mut write, room_error_code(&e), &e.to_string()).await;
            return;
        }
    };
    let room_id = joined.room_id.clone();

    if !reply(&mut write, MessageType::RoomJoined, &RoomJoinedPayload { room_id: room_id.clone() }).await {
        state.rooms.close_room(&room_id).await;
        return;
    }

    let Some(to_creator) = state.rooms.sender_to(&room_id, PeerRole::Creator).await else {
        state.rooms.close_room(&room_id).await;
        return;
    };

    run_and_close(state, &room_id, write, read, joined.rx, to_creator).await;
}

async fn run_and_close(
    state: &RendezvousState,
    room_id: &str,
    write: SplitSink<WebSocket, Message>,
    read: SplitStream<WebSocket>,
    peer_rx: mpsc::Receiver<Vec<u8>>,
    peer_tx: mpsc::Sender<Vec<u8>>,
) {
    let write = Arc::new(Mutex::new(write));
    let ws_link = WsLink { write: write.clone(), read };
    let channel_link = ChannelLink {
        tx: peer_tx.clone(),
        rx: peer_rx,
        pending_pong: false,
    };
    let outcome = run_bridge(ws_link, channel_link, state.bridge_config).await;
    info!(
        room_id,
        bytes_transferred = outcome.bytes_transferred,
        duration_ms = outcome.duration.as_millis() as u64,
        reason = ?outcome.reason,
        "room bridge closed"
    );

    if matches!(outcome.reason, BridgeEndReason::ByteCapExceeded) {
        warn!(room_id, "room exceeded its byte cap and was closed");
        let error = ControlMessage::error(ErrorCode::TransferFailed, "transfer exceeded the byte cap", now_millis());
        send_ws_control(&write, &error).await;
        send_channel_control(&peer_tx, &error).await;
    } else {
        let left = ControlMessage::new(MessageType::PeerLeft, &PeerLeftPayload { room_id: room_id.to_string() }, now_millis());
        if let Ok(left) = left {
            send_channel_control(&peer_tx, &left).await;
        }
    }

    // `close_room` is idempotent; both peers' tasks call it once their side
    // of the bridge ends, but only the first to arrive actually closes it,
    // so the gauge is only decremented once.
    if state.rooms.close_room(room_id).await {
        state.metrics.rooms_active.dec();
    }
}

#[derive(Serialize)]
struct PeerLeftPayload {
    room_id: String,
}

fn room_error_code(e: &RoomError) -> ErrorCode {
    match e {
        RoomError::RoomNotFound => ErrorCode::RoomNotFound,
        RoomError::RoomFull => ErrorCode::RoomFull,
        RoomError::RoomExpired => ErrorCode::RoomExpired,
        RoomError::MaxRoomsReached => ErrorCode::MaxRoomsReached,
        RoomError::CodeGenerationFailed { .. } => ErrorCode::InternalError,
    }
}

async fn reply<T: Serialize>(write: &mut SplitSink<WebSocket, Message>, message_type: MessageType, payload: &T) -> bool {
    let Ok(msg) = ControlMessage::new(message_type, payload, now_millis()) else {
        return false;
    };
    send_control_message(write, &msg).await
}

async fn send_error(write: &mut SplitSink<WebSocket, Message>, code: ErrorCode, message: &str) {
    let msg = ControlMessage::error(code, message, now_millis());
    send_control_message(write, &msg).await;
}

async fn send_control_message(write: &mut SplitSink<WebSocket, Message>, msg: &ControlMessage) -> bool {
    let Some(frame) = control_frame(msg) else { return false };
    write.send(Message::Binary(frame.to_vec())).await.is_ok()
}

/// Send a control message on a socket whose write half is shared with the
/// bridge (used after [`run_bridge`] returns the socket's `write` handle
/// back to the connection task, e.g. to deliver a final `ERROR`).
async fn send_ws_control(write: &Arc<Mutex<SplitSink<WebSocket, Message>>>, msg: &ControlMessage) -> bool {
    let Some(frame) = control_frame(msg) else { return false };
    write.lock().await.send(Message::Binary(frame.to_vec())).await.is_ok()
}

/// Forward a control message to the other peer's connection task through
/// the room's mpsc channel, where it surfaces as a `Frame::Control` on that
/// peer's real socket.
async fn send_channel_control(tx: &mpsc::Sender<Vec<u8>>, msg: &ControlMessage) -> bool {
    let Some(frame) = control_frame(msg) else { return false };
    tx.send(frame.to_vec()).await.is_ok()
}

fn control_frame(msg: &ControlMessage) -> Option<bytes::BytesMut> {
    let json = msg.to_json().ok()?;
    Some(Frame::new(FrameType::Control, Bytes::from(json.into_bytes())).to_bytes())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Adapts a real axum WebSocket connection into a [`PeerLink`].
///
/// `write` is shared behind a mutex so the connection task can keep a
/// handle to it after handing the link to [`run_bridge`], and send one
/// final control frame (an `ERROR` or the handshake replies) without
/// racing the bridge's own writes.
struct WsLink {
    write: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    read: SplitStream<WebSocket>,
}

impl PeerLink for WsLink {
    fn send(&mut self, data: Bytes) -> impl Future<Output = Result<(), LinkClosed>> + Send {
        async move { self.write.lock().await.send(Message::Binary(data.to_vec())).await.map_err(|_| LinkClosed) }
    }

    fn ping(&mut self) -> impl Future<Output = Result<(), LinkClosed>> + Send {
        async move {
            let frame = Frame::new(FrameType::Ping, Bytes::new()).to_bytes();
            self.write.lock().await.send(Message::Binary(frame.to_vec())).await.map_err(|_| LinkClosed)
        }
    }

    fn recv(&mut self) -> impl Future<Output = PeerEvent> + Send {
        async move {
            loop {
                match self.read.next().await {
                    Some(Ok(Message::Binary(b))) => {
                        let raw = Bytes::from(b);
                        let frame = match Frame::decode_exact(raw.clone(), DEFAULT_MAX_FRAME_SIZE) {
                            Ok(f) => f,
                            Err(_) => continue,
                        };
                        match frame.frame_type {
                            FrameType::Data => return PeerEvent::Data(raw),
                            FrameType::Pong => return PeerEvent::Pong,
                            FrameType::Ping => {
                                let pong = Frame::new(FrameType::Pong, Bytes::new()).to_bytes();
                                if self.write.lock().await.send(Message::Binary(pong.to_vec())).await.is_err() {
                                    return PeerEvent::Closed;
                                }
                            }
                            FrameType::Control => match control_message_for_bridge(&frame.payload) {
                                Some(ControlAction::Close) => return PeerEvent::Closed,
                                // SIGNAL / PAKE / ENCRYPT / DATA: forward the whole frame,
                                // header and all, to the other peer verbatim.
                                Some(ControlAction::ForwardVerbatim) => return PeerEvent::Data(raw),
                                None => continue,
                            },
                            _ => continue,
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if self.write.lock().await.send(Message::Pong(payload)).await.is_err() {
                            return PeerEvent::Closed;
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Text(_))) => continue,
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return PeerEvent::Closed,
                }
            }
        }
    }
}

enum ControlAction {
    Close,
    ForwardVerbatim,
}

fn control_message_for_bridge(payload: &[u8]) -> Option<ControlAction> {
    let text = std::str::from_utf8(payload).ok()?;
    let msg = ControlMessage::from_json(text).ok()?;
    match msg.message_type {
        MessageType::Close => Some(ControlAction::Close),
        MessageType::Ping | MessageType::Pong => None,
        MessageType::Signal | MessageType::Pake | MessageType::Encrypt | MessageType::Data => {
            Some(ControlAction::ForwardVerbatim)
        }
        // The relay interprets these itself during the handshake phase only;
        // seeing one mid-bridge means a misbehaving peer, so drop it.
        _ => None,
    }
}

/// Adapts the room manager's per-peer mpsc pair into a [`PeerLink`], so the
/// physical socket on the *other* connection task can be bridged against
/// without either task touching the other's transport directly. Bytes
/// flowing through here are always already-encoded [`Frame`]s.
struct ChannelLink {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
    pending_pong: bool,
}

impl PeerLink for ChannelLink {
    fn send(&mut self, data: Bytes) -> impl Future<Output = Result<(), LinkClosed>> + Send {
        async move { self.tx.send(data.to_vec()).await.map_err(|_| LinkClosed) }
    }

    fn ping(&mut self) -> impl Future<Output = Result<(), LinkClosed>> + Send {
        async move {
            self.pending_pong = true;
            Ok(())
        }
    }

    fn recv(&mut self) -> impl Future<Output = PeerEvent> + Send {
        async move {
            if self.pending_pong {
                self.pending_pong = false;
                return PeerEvent::Pong;
            }
            match self.rx.recv().await {
                Some(bytes) => PeerEvent::Data(Bytes::from(bytes)),
                None => PeerEvent::Closed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_error_codes_match_the_wire_contract() {
        assert_eq!(room_error_code(&RoomError::RoomNotFound), ErrorCode::RoomNotFound);
        assert_eq!(room_error_code(&RoomError::RoomFull), ErrorCode::RoomFull);
        assert_eq!(room_error_code(&RoomError::MaxRoomsReached), ErrorCode::MaxRoomsReached);
    }
}
