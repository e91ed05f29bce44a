//! Drives the rendezvous relay's `/ws` surface with two real WebSocket
//! clients end to end: room creation, joining, bridged data relay, and
//! the `PEER_LEFT` notification on disconnect. Also covers the REST
//! surface (`/health`, `/ready`, `/api/v1/rooms`, `/api/v1/stats`)
//! directly against the router.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as TMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use tallow_relay::state::RendezvousState;
use tallow_relay_middleware::Metrics;
use tallow_relay_rooms::{BridgeConfig, RoomManager, RoomManagerConfig};
use tallow_relay_wire::{ControlMessage, Frame, FrameType, MessageType, DEFAULT_MAX_FRAME_SIZE};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

fn build_state() -> RendezvousState {
    RendezvousState {
        rooms: RoomManager::new(RoomManagerConfig::default()),
        rate_limiter: None,
        metrics: Metrics::new(),
        bridge_config: BridgeConfig {
            read_deadline: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
            idle_timeout: Duration::from_secs(30),
            ping_interval: Duration::from_secs(15),
            pong_timeout: Duration::from_secs(10),
        },
    }
}

async fn spawn_rendezvous_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = tallow_relay::rendezvous::router(build_state()).into_make_service();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn send_control(ws: &mut WsStream, message_type: MessageType, payload: serde_json::Value) {
    let msg = ControlMessage::new(message_type, &payload, 0).unwrap();
    let frame = Frame::new(FrameType::Control, Bytes::from(msg.to_json().unwrap().into_bytes())).to_bytes();
    ws.send(TMessage::Binary(frame.to_vec())).await.unwrap();
}

async fn recv_control(ws: &mut WsStream) -> ControlMessage {
    let response = ws.next().await.unwrap().unwrap();
    let bytes = match response {
        TMessage::Binary(b) => b,
        other => panic!("expected a binary control frame, got {other:?}"),
    };
    let frame = Frame::decode_exact(Bytes::from(bytes), DEFAULT_MAX_FRAME_SIZE).unwrap();
    assert_eq!(frame.frame_type, FrameType::Control);
    ControlMessage::from_json(&String::from_utf8(frame.payload.to_vec()).unwrap()).unwrap()
}

#[tokio::test]
async fn room_round_trip_relays_data_and_notifies_peer_left() {
    let addr = spawn_rendezvous_server().await;
    let url = format!("ws://{addr}/ws");

    let (mut creator, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    send_control(&mut creator, MessageType::CreateRoom, serde_json::json!({})).await;
    let created = recv_control(&mut creator).await;
    assert_eq!(created.message_type, MessageType::RoomCreated);
    let code = created.payload["code"].as_str().unwrap().to_string();

    let (mut joiner, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    send_control(&mut joiner, MessageType::JoinRoom, serde_json::json!({ "code": code })).await;

    let peer_joined = recv_control(&mut creator).await;
    assert_eq!(peer_joined.message_type, MessageType::PeerJoined);
    let room_joined = recv_control(&mut joiner).await;
    assert_eq!(room_joined.message_type, MessageType::RoomJoined);

    let data = Frame::new(FrameType::Data, Bytes::from_static(b"hello")).to_bytes();
    creator.send(TMessage::Binary(data.to_vec())).await.unwrap();

    let relayed = joiner.next().await.unwrap().unwrap();
    let relayed_bytes = match relayed {
        TMessage::Binary(b) => b,
        other => panic!("expected a relayed data frame, got {other:?}"),
    };
    let relayed_frame = Frame::decode_exact(Bytes::from(relayed_bytes), DEFAULT_MAX_FRAME_SIZE).unwrap();
    assert_eq!(relayed_frame.frame_type, FrameType::Data);
    assert_eq!(relayed_frame.payload.as_ref(), b"hello");

    creator.close(None).await.unwrap();
    drop(creator);

    let left = recv_control(&mut joiner).await;
    assert_eq!(left.message_type, MessageType::PeerLeft);
}

#[tokio::test]
async fn joining_an_unknown_code_returns_room_not_found() {
    let addr = spawn_rendezvous_server().await;
    let url = format!("ws://{addr}/ws");

    let (mut joiner, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    send_control(&mut joiner, MessageType::JoinRoom, serde_json::json!({ "code": "nonexistent-code-words" })).await;

    let error = recv_control(&mut joiner).await;
    assert_eq!(error.message_type, MessageType::Error);
    assert_eq!(error.payload["code"], "ROOM_NOT_FOUND");
}

#[tokio::test]
async fn rest_routes_report_health_and_stats() {
    let app = tallow_relay::rendezvous::router(build_state());

    for path in ["/health", "/ready", "/api/v1/rooms", "/api/v1/stats"] {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "path {path} did not return 200");
    }
}
