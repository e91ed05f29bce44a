//! Shared state handed to the onion relay and rendezvous HTTP surfaces.

use std::sync::Arc;
use std::time::Duration;

use tallow_relay_circuits::{CircuitTable, SessionTable};
use tallow_relay_crypto::KeyManager;
use tallow_relay_middleware::Metrics;
use tallow_relay_ratelimit::RateLimiter;
use tallow_relay_rooms::RoomManager;

/// Where fully-peeled exit traffic goes. The end-user transfer application
/// that would consume this data is an external collaborator (out of
/// scope); the shipped sink only accounts for and logs what arrives.
pub trait ExitSink: Send + Sync {
    fn deliver(&self, circuit_id: &str, payload: &[u8]);
}

pub struct DiscardExitSink;

impl ExitSink for DiscardExitSink {
    fn deliver(&self, circuit_id: &str, payload: &[u8]) {
        tracing::debug!(circuit_id, bytes = payload.len(), "exit sink received payload with no destination wired");
    }
}

/// Shared state for the onion relay WebSocket surface.
#[derive(Clone)]
pub struct OnionState {
    pub key_manager: Arc<KeyManager>,
    pub circuits: CircuitTable,
    pub sessions: SessionTable,
    pub rate_limiter: Option<RateLimiter>,
    pub metrics: Metrics,
    pub max_circuits_per_client: u32,
    pub circuit_idle_timeout: Duration,
    pub max_onion_message_bytes: u32,
    pub exit_sink: Arc<dyn ExitSink>,
}

/// Shared state for the rendezvous WebSocket surface.
#[derive(Clone)]
pub struct RendezvousState {
    pub rooms: RoomManager,
    pub rate_limiter: Option<RateLimiter>,
    pub metrics: Metrics,
    pub bridge_config: tallow_relay_rooms::BridgeConfig,
}
