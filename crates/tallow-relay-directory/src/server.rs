//! The directory's REST surface: registration, heartbeats, listings,
//! health, and readiness.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::model::{HeartbeatRequest, ListFilter, RegisterRequest, RelayHealth, RelaySummary};
use crate::registry::DirectoryRegistry;

#[derive(Clone)]
struct AppState {
    registry: DirectoryRegistry,
}

/// Build the directory's `axum` router over `registry`.
pub fn build_router(registry: DirectoryRegistry) -> Router {
    let state = AppState { registry };
    Router::new()
        .route("/relays", get(list_relays))
        .route("/relays/{id}", get(get_relay).delete(delete_relay))
        .route("/relays/{id}/health", get(get_relay_health))
        .route("/relays/register", post(register_relay).put(heartbeat_relay))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(Arc::new(state))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

async fn register_relay(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    match state.registry.register(req, Utc::now()).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(err) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

async fn heartbeat_relay(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeartbeatRequest>,
) -> Response {
    match state
        .registry
        .heartbeat(&req.id, req.current_load, req.uptime_seconds, Utc::now())
        .await
    {
        Ok(entry) => Json(entry).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "no relay with that id"),
    }
}

async fn list_relays(State(state): State<Arc<AppState>>, Query(filter): Query<ListFilter>) -> Response {
    let entries = state.registry.list(filter, Utc::now()).await;
    let summaries: Vec<RelaySummary> = entries.iter().map(RelaySummary::from).collect();
    Json(summaries).into_response()
}

async fn get_relay(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.registry.get(&id, Utc::now()).await {
        Some(entry) => Json(entry).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no relay with that id"),
    }
}

async fn get_relay_health(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.registry.get(&id, Utc::now()).await {
        Some(entry) => Json(RelayHealth::from(&entry)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no relay with that id"),
    }
}

async fn delete_relay(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if state.registry.delete(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "no relay with that id")
    }
}

async fn stats(State(state): State<Arc<AppState>>) -> Response {
    Json(state.registry.stats(Utc::now()).await).into_response()
}

async fn health() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

async fn ready() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelayMode;
    use crate::registry::DirectoryConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn sample_register() -> RegisterRequest {
        RegisterRequest {
            id: "r1".into(),
            public_key: "deadbeef".into(),
            endpoint: "wss://relay.example:9001".into(),
            mode: RelayMode::Entry,
            version: "1.0.0".into(),
            capabilities: vec![],
            max_bandwidth: 0,
            current_load: 0.0,
            uptime_seconds: 0,
            country: None,
            asn: None,
        }
    }

    #[tokio::test]
    async fn register_then_list_round_trips() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let app = build_router(registry);

        let body = serde_json::to_vec(&sample_register()).unwrap();
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/relays/register")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(Request::builder().uri("/relays").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_relay_health_is_404() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let app = build_router(registry);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/relays/nope/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_and_ready_are_ok() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let app = build_router(registry);
        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
