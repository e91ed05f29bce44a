//! Drives the directory's REST surface over a real TCP listener with
//! [`DirectoryClient`], rather than just dispatching requests through the
//! router in-process.

use chrono::Utc;

use tallow_relay_directory::{
    build_router, DirectoryClient, DirectoryConfig, DirectoryRegistry, HeartbeatRequest,
    ListFilter, RegisterRequest, RelayMode,
};

async fn spawn_directory() -> String {
    let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(registry).into_make_service();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn sample_register(id: &str) -> RegisterRequest {
    RegisterRequest {
        id: id.to_string(),
        public_key: "deadbeef".into(),
        endpoint: format!("wss://{id}.relay.example:9001"),
        mode: RelayMode::Entry,
        version: "1.0.0".into(),
        capabilities: vec!["onion".into()],
        max_bandwidth: 1_000_000,
        current_load: 0.0,
        uptime_seconds: 0,
        country: None,
        asn: None,
    }
}

#[tokio::test]
async fn register_heartbeat_list_and_delete_round_trip_over_http() {
    let base_url = spawn_directory().await;
    let client = DirectoryClient::new(&base_url);

    let registered = client.register(&sample_register("relay-a")).await.unwrap();
    assert_eq!(registered.id, "relay-a");
    assert!(registered.online);

    let heartbeat = client
        .heartbeat(&HeartbeatRequest {
            id: "relay-a".into(),
            current_load: 0.42,
            uptime_seconds: 120,
        })
        .await
        .unwrap();
    assert_eq!(heartbeat.current_load, 0.42);
    assert_eq!(heartbeat.uptime_seconds, 120);

    let listed = client.list_relays(&ListFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "relay-a");

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.total_relays, 1);

    let fetched = client.get_relay("relay-a").await.unwrap();
    assert_eq!(fetched.id, "relay-a");

    let http = reqwest::Client::new();
    let resp = http.delete(format!("{base_url}/relays/relay-a")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    let after_delete = client.list_relays(&ListFilter::default()).await.unwrap();
    assert!(after_delete.is_empty());
}

#[tokio::test]
async fn heartbeat_for_an_unregistered_relay_fails() {
    let base_url = spawn_directory().await;
    let client = DirectoryClient::new(&base_url);

    let err = client
        .heartbeat(&HeartbeatRequest {
            id: "ghost".into(),
            current_load: 0.0,
            uptime_seconds: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, tallow_relay_directory::DirectoryClientError::Http(404)));
}
