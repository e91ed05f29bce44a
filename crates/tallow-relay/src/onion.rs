//! The onion relay's client-facing WebSocket surface: HELLO through
//! HEARTBEAT, dispatched per connection.
//!
//! The same handler also serves relay-to-relay traffic: when this relay
//! dials a next hop for EXTEND_CIRCUIT, it connects to that hop's `/ws`
//! endpoint and looks, from the next hop's point of view, exactly like any
//! other client.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tracing::{debug, info, warn};

use tallow_relay_circuits::{
    open_extend_payload, open_relay_data, process_create_circuit, process_hello, seal_circuit_extended,
    seal_heartbeat_ack, seal_relay_data, ExtendRequest,
};
use tallow_relay_crypto::{seal, CryptoError, KemCiphertext, KemKeyPair};
use tallow_relay_wire::{OnionFrame, OnionFrameType, DEFAULT_MAX_ONION_MESSAGE_SIZE};

use crate::state::OnionState;

pub fn router(state: OnionState) -> Router {
    Router::new().route("/ws", get(upgrade)).with_state(state)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<OnionState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, addr, state))
}

type ClientWrite = Arc<Mutex<SplitSink<WebSocket, AxumMessage>>>;

/// The outbound link for one circuit once EXTEND_CIRCUIT has dialed it.
struct NextHop {
    write: Mutex<SplitSink<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>, TungsteniteMessage>>,
}

async fn handle_connection(socket: WebSocket, addr: SocketAddr, state: OnionState) {
    let peer_id = format!("{addr}-{}", random_suffix());
    let source = addr.ip().to_string();
    state.sessions.register(peer_id.clone(), source.clone()).await;
    state.metrics.active_connections.inc();

    let (write, mut read) = socket.split();
    let write: ClientWrite = Arc::new(Mutex::new(write));
    let mut next_hop: Option<Arc<NextHop>> = None;
    let mut owned_circuits: Vec<String> = Vec::new();

    while let Some(Ok(msg)) = read.next().await {
        let bytes = match msg {
            AxumMessage::Binary(b) => b,
            AxumMessage::Close(_) => break,
            _ => continue,
        };

        let frame = match OnionFrame::decode_exact(Bytes::from(bytes), state.max_onion_message_bytes) {
            Ok(f) => f,
            Err(e) => {
                warn!(peer_id = %peer_id, error = %e, "dropping malformed onion frame");
                let message = match e {
                    tallow_relay_wire::WireError::FrameTooLarge { .. } => "Message too large",
                    _ => "Malformed onion frame",
                };
                if let Some(reply) = error_frame(0, Bytes::new(), message) {
                    let mut guard = write.lock().await;
                    if guard.send(AxumMessage::Binary(reply.to_vec())).await.is_err() {
                        break;
                    }
                }
                continue;
            }
        };

        if let Some(reply) = dispatch(&state, &peer_id, &source, frame, &mut next_hop, &mut owned_circuits, write.clone()).await {
            let mut guard = write.lock().await;
            if guard.send(AxumMessage::Binary(reply.to_vec())).await.is_err() {
                break;
            }
        }
    }

    for circuit_id in &owned_circuits {
        if let Some(circuit) = state.circuits.destroy(circuit_id).await {
            state.metrics.circuits_active.dec();
            debug!(circuit_id, bytes = circuit.bytes_forwarded, "circuit torn down on disconnect");
        }
        state.sessions.release_circuit(&peer_id).await;
    }
    state.sessions.remove(&peer_id).await;
    state.metrics.active_connections.dec();
}

async fn dispatch(
    state: &OnionState,
    peer_id: &str,
    source: &str,
    frame: OnionFrame,
    next_hop: &mut Option<Arc<NextHop>>,
    owned_circuits: &mut Vec<String>,
    client_write: ClientWrite,
) -> Option<BytesMut> {
    match frame.frame_type {
        OnionFrameType::Hello => handle_hello(state, peer_id, frame).await,
        OnionFrameType::CreateCircuit => handle_create_circuit(state, peer_id, source, frame, owned_circuits).await,
        OnionFrameType::ExtendCircuit => handle_extend_circuit(state, peer_id, frame, next_hop, client_write).await,
        OnionFrameType::DestroyCircuit => handle_destroy_circuit(state, peer_id, frame, owned_circuits).await,
        OnionFrameType::RelayData => handle_relay_data(state, peer_id, frame, next_hop).await,
        OnionFrameType::Heartbeat => handle_heartbeat(state, peer_id, frame).await,
        other => {
            warn!(peer_id, frame_type = ?other, "unexpected onion frame type from client");
            error_frame(frame.request_id, frame.circuit_id, "INVALID_MESSAGE")
        }
    }
}

fn error_frame(request_id: u32, circuit_id: Bytes, message: &str) -> Option<BytesMut> {
    OnionFrame::new(OnionFrameType::Error, request_id, circuit_id, Bytes::copy_from_slice(message.as_bytes()))
        .ok()
        .and_then(|f| f.to_bytes().ok())
}

async fn handle_hello(state: &OnionState, peer_id: &str, frame: OnionFrame) -> Option<BytesMut> {
    match process_hello(&frame.payload) {
        Ok(outcome) => {
            if state.sessions.authenticate(peer_id, outcome.session_key).await.is_err() {
                return error_frame(frame.request_id, frame.circuit_id, "HANDSHAKE_FAILED");
            }
            OnionFrame::new(OnionFrameType::HelloResponse, frame.request_id, frame.circuit_id, outcome.response_bytes)
                .ok()
                .and_then(|f| f.to_bytes().ok())
        }
        Err(e) => {
            warn!(peer_id, error = %e, "hello handshake failed");
            error_frame(frame.request_id, frame.circuit_id, "HANDSHAKE_FAILED")
        }
    }
}

async fn handle_create_circuit(
    state: &OnionState,
    peer_id: &str,
    source: &str,
    frame: OnionFrame,
    owned_circuits: &mut Vec<String>,
) -> Option<BytesMut> {
    if !state.sessions.is_authenticated(peer_id).await {
        return error_frame(frame.request_id, frame.circuit_id, "HANDSHAKE_FAILED");
    }
    if let Some(limiter) = &state.rate_limiter {
        if !limiter.allow(source).await {
            state.metrics.rate_limit_hits_total.inc();
            return error_frame(frame.request_id, frame.circuit_id, "RATE_LIMITED");
        }
    }
    if state.sessions.try_reserve_circuit(peer_id).await.is_err() {
        return error_frame(frame.request_id, frame.circuit_id, "TOO_MANY_CIRCUITS");
    }

    let requested_id = (!frame.circuit_id.is_empty()).then(|| String::from_utf8_lossy(&frame.circuit_id).into_owned());
    let outcome = match process_create_circuit(&state.key_manager, &frame.payload, requested_id) {
        Ok(o) => o,
        Err(e) => {
            state.sessions.release_circuit(peer_id).await;
            warn!(peer_id, error = %e, "create_circuit handshake failed");
            return error_frame(frame.request_id, frame.circuit_id, "HANDSHAKE_FAILED");
        }
    };

    if let Err(e) = state
        .circuits
        .install(outcome.circuit_id.clone(), peer_id.to_string(), outcome.circuit_key)
        .await
    {
        state.sessions.release_circuit(peer_id).await;
        warn!(peer_id, error = %e, "failed to install circuit");
        return error_frame(frame.request_id, frame.circuit_id, "INTERNAL_ERROR");
    }
    owned_circuits.push(outcome.circuit_id.clone());
    state.metrics.circuits_active.inc();
    state.metrics.circuits_created_total.inc();
    info!(peer_id, circuit_id = %outcome.circuit_id, "circuit created");

    let session_key = state.sessions.session_key(peer_id).await?;
    let sealed = seal(&session_key, &[tallow_relay_circuits::STATUS_OK]).ok()?;
    OnionFrame::new(
        OnionFrameType::CircuitCreated,
        frame.request_id,
        Bytes::from(outcome.circuit_id.into_bytes()),
        sealed,
    )
    .ok()
    .and_then(|f| f.to_bytes().ok())
}

async fn handle_extend_circuit(
    state: &OnionState,
    peer_id: &str,
    frame: OnionFrame,
    next_hop: &mut Option<Arc<NextHop>>,
    client_write: ClientWrite,
) -> Option<BytesMut> {
    let circuit_id = String::from_utf8_lossy(&frame.circuit_id).into_owned();
    let circuit = state.circuits.get(&circuit_id).await?;
    if circuit.client_peer != peer_id {
        return error_frame(frame.request_id, frame.circuit_id, "no such circuit");
    }

    let extend = match open_extend_payload(&circuit.circuit_key, &frame.payload) {
        Ok(r) => r,
        Err(e) => {
            warn!(peer_id, circuit_id, error = %e, "failed to open extend payload");
            return error_frame(frame.request_id, frame.circuit_id, "Failed to extend circuit");
        }
    };
    let next_hop_address = extend.next_hop_address.clone();

    let hop = match dial_and_create(&circuit_id, extend).await {
        Ok(h) => h,
        Err(e) => {
            warn!(peer_id, circuit_id, next_hop = %next_hop_address, error = %e, "failed to extend circuit");
            return error_frame(frame.request_id, frame.circuit_id, "Failed to extend circuit");
        }
    };

    if state
        .circuits
        .extend(&circuit_id, next_hop_address.clone(), next_hop_address.clone())
        .await
        .is_err()
    {
        return error_frame(frame.request_id, frame.circuit_id, "no such circuit");
    }

    let (write, read) = hop;
    let hop = Arc::new(NextHop { write: Mutex::new(write) });
    *next_hop = Some(hop.clone());
    spawn_next_hop_reader(state.clone(), circuit_id.clone(), circuit.circuit_key, read, client_write);

    let session_key = state.sessions.session_key(peer_id).await?;
    let sealed = match seal_circuit_extended(&circuit.circuit_key, &session_key) {
        Ok(s) => s,
        Err(_) => return error_frame(frame.request_id, frame.circuit_id, "INTERNAL_ERROR"),
    };
    OnionFrame::new(OnionFrameType::CircuitExtended, frame.request_id, frame.circuit_id, sealed)
        .ok()
        .and_then(|f| f.to_bytes().ok())
}

type NextHopStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Dial `extend.next_hop_address`, perform a fresh ephemeral HELLO to
/// satisfy the next hop's authentication precondition, then forward the
/// client's own ciphertext as a CREATE_CIRCUIT addressed to that hop's
/// identity key. Returns the dialed connection's split halves once the
/// next hop acknowledges with `CIRCUIT_CREATED`.
async fn dial_and_create(
    circuit_id: &str,
    extend: ExtendRequest,
) -> Result<(SplitSink<NextHopStream, TungsteniteMessage>, SplitStream<NextHopStream>), DialError> {
    let (stream, _response) = tokio_tungstenite::connect_async(&extend.next_hop_address).await?;
    let (mut write, mut read) = stream.split();

    let ephemeral = KemKeyPair::generate();
    let mut hello_payload = Vec::with_capacity(1 + tallow_relay_crypto::PUBLIC_KEY_BYTES);
    hello_payload.push(tallow_relay_circuits::HELLO_VERSION);
    hello_payload.extend_from_slice(ephemeral.public_key().as_bytes());
    let hello = OnionFrame::new(OnionFrameType::Hello, 0, Bytes::new(), hello_payload)?;
    write.send(TungsteniteMessage::Binary(hello.to_bytes()?.to_vec())).await?;

    let hello_response = next_onion_frame(&mut read).await?;
    if hello_response.frame_type != OnionFrameType::HelloResponse {
        return Err(DialError::UnexpectedResponse);
    }
    if hello_response.payload.len() < 1 + tallow_relay_crypto::CIPHERTEXT_BYTES {
        return Err(DialError::UnexpectedResponse);
    }
    let _ephemeral_secret = ephemeral.decapsulate(&KemCiphertext::from_bytes(&hello_response.payload[1..])?)?;

    let create_circuit = OnionFrame::new(
        OnionFrameType::CreateCircuit,
        0,
        Bytes::copy_from_slice(circuit_id.as_bytes()),
        extend.next_hop_ciphertext,
    )?;
    write.send(TungsteniteMessage::Binary(create_circuit.to_bytes()?.to_vec())).await?;

    let created = next_onion_frame(&mut read).await?;
    if created.frame_type != OnionFrameType::CircuitCreated {
        return Err(DialError::UnexpectedResponse);
    }

    Ok((write, read))
}

async fn next_onion_frame(read: &mut SplitStream<NextHopStream>) -> Result<OnionFrame, DialError> {
    let msg = read.next().await.ok_or(DialError::Closed)??;
    let bytes = match msg {
        TungsteniteMessage::Binary(b) => b,
        _ => return Err(DialError::UnexpectedResponse),
    };
    Ok(OnionFrame::decode_exact(Bytes::from(bytes), DEFAULT_MAX_ONION_MESSAGE_SIZE)?)
}

#[derive(Debug, thiserror::Error)]
enum DialError {
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Wire(#[from] tallow_relay_wire::WireError),
    #[error("next hop closed the connection before completing the handshake")]
    Closed,
    #[error("next hop returned an unexpected response")]
    UnexpectedResponse,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Forward `RELAY_DATA` arriving from the next hop back to the client that
/// owns this circuit, adding one onion layer under `circuit_key` as it
/// goes (§4.3: bytes from the next hop are sealed and forwarded inbound).
fn spawn_next_hop_reader(
    state: OnionState,
    circuit_id: String,
    circuit_key: [u8; 32],
    mut read: SplitStream<NextHopStream>,
    client_write: ClientWrite,
) {
    tokio::spawn(async move {
        while let Some(Ok(msg)) = read.next().await {
            let bytes = match msg {
                TungsteniteMessage::Binary(b) => b,
                TungsteniteMessage::Close(_) => break,
                _ => continue,
            };
            let frame = match OnionFrame::decode_exact(Bytes::from(bytes), DEFAULT_MAX_ONION_MESSAGE_SIZE) {
                Ok(f) => f,
                Err(_) => continue,
            };
            if frame.frame_type != OnionFrameType::RelayData {
                continue;
            }
            let sealed = match seal_relay_data(&circuit_key, &frame.payload) {
                Ok(s) => s,
                Err(_) => continue,
            };
            let Ok(onward) = OnionFrame::new(OnionFrameType::RelayData, frame.request_id, Bytes::copy_from_slice(circuit_id.as_bytes()), sealed)
            else {
                continue;
            };
            let Ok(encoded) = onward.to_bytes() else { continue };
            let mut guard = client_write.lock().await;
            if guard.send(AxumMessage::Binary(encoded.to_vec())).await.is_err() {
                break;
            }
        }
        let _ = state.circuits.touch(&circuit_id).await;
    });
}

async fn handle_destroy_circuit(
    state: &OnionState,
    peer_id: &str,
    frame: OnionFrame,
    owned_circuits: &mut Vec<String>,
) -> Option<BytesMut> {
    let circuit_id = String::from_utf8_lossy(&frame.circuit_id).into_owned();
    if let Some(circuit) = state.circuits.get(&circuit_id).await {
        if circuit.client_peer == peer_id {
            state.circuits.destroy(&circuit_id).await;
            state.sessions.release_circuit(peer_id).await;
            state.metrics.circuits_active.dec();
            owned_circuits.retain(|id| id != &circuit_id);
        }
    }
    None
}

async fn handle_relay_data(
    state: &OnionState,
    peer_id: &str,
    frame: OnionFrame,
    next_hop: &mut Option<Arc<NextHop>>,
) -> Option<BytesMut> {
    let circuit_id = String::from_utf8_lossy(&frame.circuit_id).into_owned();
    let circuit = state.circuits.get(&circuit_id).await?;
    if circuit.client_peer != peer_id {
        return None;
    }

    let plaintext = open_relay_data(&circuit.circuit_key, &frame.payload)?;
    let _ = state.circuits.record_forwarded(&circuit_id, plaintext.len() as u64).await;
    state.metrics.bytes_forwarded_total.inc_by(plaintext.len() as u64);

    match next_hop {
        Some(hop) => {
            if let Ok(onward) = OnionFrame::new(OnionFrameType::RelayData, frame.request_id, frame.circuit_id.clone(), plaintext) {
                if let Ok(bytes) = onward.to_bytes() {
                    let mut guard = hop.write.lock().await;
                    let _ = guard.send(TungsteniteMessage::Binary(bytes.to_vec())).await;
                }
            }
        }
        None => {
            state.exit_sink.deliver(&circuit_id, &plaintext);
        }
    }
    None
}

async fn handle_heartbeat(state: &OnionState, peer_id: &str, frame: OnionFrame) -> Option<BytesMut> {
    if !frame.circuit_id.is_empty() {
        let circuit_id = String::from_utf8_lossy(&frame.circuit_id).into_owned();
        let _ = state.circuits.touch(&circuit_id).await;
    }
    let session_key = state.sessions.session_key(peer_id).await?;
    let sealed = seal_heartbeat_ack(&session_key).ok()?;
    OnionFrame::new(OnionFrameType::HeartbeatAck, frame.request_id, frame.circuit_id, sealed)
        .ok()
        .and_then(|f| f.to_bytes().ok())
}

fn random_suffix() -> String {
    let mut bytes = [0u8; 8];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    hex::encode(bytes)
}
