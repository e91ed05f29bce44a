//! The relay binary's internals, exposed as a library so integration
//! tests can build the onion and rendezvous routers in-process without
//! going through `main`.

pub mod cli;
pub mod config;
pub mod directory_task;
pub mod err;
pub mod logging;
pub mod metrics_server;
pub mod onion;
pub mod rendezvous;
pub mod shutdown;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use tracing::info;

use tallow_relay_circuits::{CircuitTable, SessionTable};
use tallow_relay_crypto::KeyManager;
use tallow_relay_directory::{build_router, DirectoryConfig, DirectoryRegistry};
use tallow_relay_middleware::{
    panic_recovery, permissive_cors, request_logging, security_headers, Metrics, MetricsLayer,
    RateLimitLayer,
};
use tallow_relay_ratelimit::{RateLimiter, RateLimiterConfig};
use tallow_relay_rooms::{BridgeConfig, RoomManager, RoomManagerConfig};

use config::RelayConfig;
use err::RelayError;
use shutdown::Shutdown;
use state::{DiscardExitSink, OnionState, RendezvousState};

/// Resolve `cfg` into the right router for `cfg.mode`, bind the listener,
/// and serve it until `shutdown` fires.
pub async fn run(cfg: RelayConfig) -> Result<(), RelayError> {
    let (shutdown, _shutdown_rx) = Shutdown::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            Shutdown::wait_for_signal().await;
            info!("shutdown signal received, draining in-flight work");
            shutdown.trigger();
        }
    });
    let metrics = Metrics::new();

    let router = match cfg.mode.as_str() {
        "directory" => directory_router(&cfg, metrics.clone(), shutdown.subscribe()),
        "rendezvous" => rendezvous_router(&cfg, metrics.clone(), shutdown.subscribe())?,
        _ => onion_router(&cfg, metrics.clone(), shutdown.subscribe()).await?,
    };

    let app = apply_middleware(router, &cfg, metrics.clone());

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| RelayError::Config(format!("invalid server address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind { addr: addr.to_string(), source })?;
    info!(mode = %cfg.mode, %addr, "relay listening");

    if cfg.metrics.enabled {
        spawn_metrics_server(&cfg, metrics.clone(), shutdown.subscribe()).await?;
    }

    let shutdown_for_serve = shutdown.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let mut rx = shutdown_for_serve.subscribe();
            let _ = rx.changed().await;
        })
        .await
        .map_err(RelayError::Io)?;

    Ok(())
}

fn apply_middleware(router: Router, cfg: &RelayConfig, metrics: Metrics) -> Router {
    let mut app = router
        .layer(axum::middleware::from_fn(security_headers))
        .layer(permissive_cors());

    if let Some(limiter) = build_rate_limiter(cfg) {
        app = app.layer(RateLimitLayer::new(limiter, metrics.clone()));
    }

    app.layer(MetricsLayer::new(metrics.clone()))
        .layer(request_logging())
        .layer(panic_recovery(metrics))
}

fn build_rate_limiter(cfg: &RelayConfig) -> Option<RateLimiter> {
    if !cfg.rate_limit.enabled {
        return None;
    }
    Some(RateLimiter::new(RateLimiterConfig {
        rps: cfg.rate_limit.rps as f64,
        burst: cfg.rate_limit.burst as f64,
        max_violations: cfg.rate_limit.max_violations,
        ban_duration: Duration::from_secs(cfg.rate_limit.ban_duration_secs),
        ..RateLimiterConfig::default()
    }))
}

async fn onion_router(
    cfg: &RelayConfig,
    metrics: Metrics,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<Router, RelayError> {
    let key_manager = std::sync::Arc::new(KeyManager::load_or_generate(&cfg.server.keystore_path)?);
    let circuits = CircuitTable::new();
    let sessions = SessionTable::new(cfg.server.max_circuits_per_client);

    tokio::spawn({
        let circuits = circuits.clone();
        let idle_timeout = cfg.circuit_idle_timeout();
        let shutdown_rx = shutdown_rx.clone();
        async move {
            circuits.run_idle_gc_loop(Duration::from_secs(60), idle_timeout, shutdown_rx).await;
        }
    });

    let relay_id = cfg.relay_id.clone().unwrap_or_else(|| key_manager.relay_id());
    directory_task::spawn(
        cfg,
        metrics.clone(),
        hex::encode(key_manager.public_key_bytes()),
        relay_id,
        shutdown_rx,
    )
    .await;

    let rate_limiter = build_rate_limiter(cfg);
    let onion_state = OnionState {
        key_manager,
        circuits,
        sessions,
        rate_limiter,
        metrics,
        max_circuits_per_client: cfg.server.max_circuits_per_client,
        circuit_idle_timeout: cfg.circuit_idle_timeout(),
        max_onion_message_bytes: cfg.server.max_onion_message_bytes,
        exit_sink: std::sync::Arc::new(DiscardExitSink),
    };

    Ok(onion::router(onion_state))
}

fn rendezvous_router(
    cfg: &RelayConfig,
    metrics: Metrics,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<Router, RelayError> {
    let rooms = RoomManager::new(RoomManagerConfig {
        max_rooms: cfg.room.max_rooms,
        default_expiry: Duration::from_secs(cfg.room.default_expiry_secs),
        max_expiry: Duration::from_secs(cfg.room.max_expiry_secs),
        cleanup_interval: Duration::from_secs(cfg.room.cleanup_interval_secs),
        ..RoomManagerConfig::default()
    });

    tokio::spawn({
        let rooms = rooms.clone();
        async move {
            rooms.run_expiry_loop(shutdown_rx).await;
        }
    });

    let rendezvous_state = RendezvousState {
        rooms,
        rate_limiter: build_rate_limiter(cfg),
        metrics,
        bridge_config: BridgeConfig {
            read_deadline: Duration::from_secs(cfg.bridge.read_deadline_secs),
            max_bytes: cfg.bridge.max_bytes,
            idle_timeout: Duration::from_secs(cfg.bridge.idle_timeout_secs),
            ping_interval: Duration::from_secs(cfg.bridge.ping_interval_secs),
            pong_timeout: Duration::from_secs(cfg.bridge.pong_timeout_secs),
        },
    };

    Ok(rendezvous::router(rendezvous_state))
}

fn directory_router(cfg: &RelayConfig, _metrics: Metrics, shutdown_rx: tokio::sync::watch::Receiver<bool>) -> Router {
    let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
    tokio::spawn({
        let registry = registry.clone();
        async move {
            registry.run_gc_loop(shutdown_rx).await;
        }
    });
    let _ = cfg;
    build_router(registry)
}

async fn spawn_metrics_server(
    cfg: &RelayConfig,
    metrics: Metrics,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<(), RelayError> {
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.metrics.port)
        .parse()
        .map_err(|e| RelayError::Config(format!("invalid metrics address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind { addr: addr.to_string(), source })?;
    let router = metrics_server::router(metrics, &cfg.metrics.path);
    info!(%addr, path = %cfg.metrics.path, "metrics endpoint listening");

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });
    Ok(())
}
