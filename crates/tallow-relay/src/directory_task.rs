//! Wires a non-directory relay into the directory service: one-time
//! registration (with retry) followed by a background heartbeat loop.

use std::time::Instant as StdInstant;

use tokio::sync::watch;
use tracing::{info, warn};

use tallow_relay_directory::{DirectoryClient, HeartbeatConfig, RegisterRequest, RelayMode as DirectoryRelayMode};
use tallow_relay_middleware::Metrics;

use crate::config::RelayConfig;

/// Register with the configured directory and spawn its heartbeat loop.
/// A directory that never answers is logged and otherwise ignored per
/// §4.10: the relay stays usable without one.
pub async fn spawn(
    config: &RelayConfig,
    metrics: Metrics,
    public_key_hex: String,
    relay_id: String,
    shutdown: watch::Receiver<bool>,
) {
    let Some(directory_url) = config.directory_url.clone() else {
        return;
    };
    let mode = directory_mode(&config.mode);
    let client = DirectoryClient::new(directory_url);
    let endpoint = format!("{}:{}", config.server.host, config.server.port);

    let request = RegisterRequest {
        id: relay_id.clone(),
        public_key: public_key_hex,
        endpoint,
        mode,
        version: env!("CARGO_PKG_VERSION").to_string(),
        capabilities: Vec::new(),
        max_bandwidth: 0,
        current_load: 0.0,
        uptime_seconds: 0,
        country: None,
        asn: None,
    };

    match client.register_with_retry(&request).await {
        Ok(_) => info!(relay_id = %relay_id, "registered with directory"),
        Err(err) => {
            warn!(relay_id = %relay_id, error = %err, "failed to register with directory after retries; continuing unregistered");
            return;
        }
    }

    let started_at = StdInstant::now();
    let relay_id_for_loop = relay_id.clone();
    tokio::spawn(async move {
        client
            .run_heartbeat_loop(
                relay_id_for_loop,
                HeartbeatConfig::default(),
                move || current_load(&metrics, started_at),
                shutdown,
            )
            .await;
    });
}

/// Sampled synchronously (no circuit table lock) because the heartbeat
/// client's callback is not async; the active-circuit gauge it reads is
/// updated in lock-step with the circuit table by the onion handler.
fn current_load(metrics: &Metrics, started_at: StdInstant) -> (f64, u64) {
    let active = metrics.circuits_active.get() as f64;
    let uptime = started_at.elapsed().as_secs();
    (active, uptime)
}

fn directory_mode(mode: &str) -> DirectoryRelayMode {
    match mode {
        "middle" => DirectoryRelayMode::Middle,
        "exit" => DirectoryRelayMode::Exit,
        _ => DirectoryRelayMode::Entry,
    }
}
