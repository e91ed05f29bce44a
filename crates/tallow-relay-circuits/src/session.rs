//! Per-connection client session state: authentication (exactly once) and
//! the circuit-count cap that CREATE_CIRCUIT enforces.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::err::HandshakeError;

/// State tracked for a single inbound client WebSocket connection.
#[derive(Clone, Debug)]
pub struct ClientSession {
    pub peer_id: String,
    pub source_addr: String,
    pub session_key: Option<[u8; 32]>,
    pub authenticated: bool,
    pub circuit_count: u32,
    pub connected_at: Instant,
}

/// The shared table of connected clients.
#[derive(Clone)]
pub struct SessionTable {
    inner: Arc<RwLock<HashMap<String, ClientSession>>>,
    max_circuits_per_client: u32,
}

impl SessionTable {
    pub fn new(max_circuits_per_client: u32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_circuits_per_client,
        }
    }

    /// Register a newly accepted connection, unauthenticated.
    pub async fn register(&self, peer_id: String, source_addr: String) {
        let mut inner = self.inner.write().await;
        inner.insert(
            peer_id.clone(),
            ClientSession {
                peer_id,
                source_addr,
                session_key: None,
                authenticated: false,
                circuit_count: 0,
                connected_at: Instant::now(),
            },
        );
    }

    /// Transition a session to authenticated, recording its session key.
    ///
    /// Fails if the session was already authenticated: the session key is
    /// never renegotiated (§8, invariant 3).
    pub async fn authenticate(&self, peer_id: &str, session_key: [u8; 32]) -> Result<(), HandshakeError> {
        let mut inner = self.inner.write().await;
        let session = inner.get_mut(peer_id).ok_or(HandshakeError::NotAuthenticated)?;
        if session.authenticated {
            return Err(HandshakeError::AlreadyAuthenticated);
        }
        session.authenticated = true;
        session.session_key = Some(session_key);
        Ok(())
    }

    pub async fn session_key(&self, peer_id: &str) -> Option<[u8; 32]> {
        let inner = self.inner.read().await;
        inner.get(peer_id).and_then(|s| s.session_key)
    }

    pub async fn is_authenticated(&self, peer_id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.get(peer_id).is_some_and(|s| s.authenticated)
    }

    /// Check CREATE_CIRCUIT preconditions and, if they hold, reserve a slot
    /// by incrementing `circuit_count`.
    pub async fn try_reserve_circuit(&self, peer_id: &str) -> Result<(), HandshakeError> {
        let mut inner = self.inner.write().await;
        let session = inner.get_mut(peer_id).ok_or(HandshakeError::NotAuthenticated)?;
        if !session.authenticated {
            return Err(HandshakeError::NotAuthenticated);
        }
        if session.circuit_count >= self.max_circuits_per_client {
            return Err(HandshakeError::TooManyCircuits);
        }
        session.circuit_count += 1;
        Ok(())
    }

    /// Release a previously reserved circuit slot, e.g. on DESTROY_CIRCUIT.
    pub async fn release_circuit(&self, peer_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.get_mut(peer_id) {
            session.circuit_count = session.circuit_count.saturating_sub(1);
        }
    }

    /// Remove a session entirely, e.g. on connection close.
    pub async fn remove(&self, peer_id: &str) -> Option<ClientSession> {
        let mut inner = self.inner.write().await;
        inner.remove(peer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authenticate_transitions_exactly_once() {
        let table = SessionTable::new(4);
        table.register("peer-1".into(), "1.2.3.4:1234".into()).await;
        table.authenticate("peer-1", [0u8; 32]).await.unwrap();
        let err = table.authenticate("peer-1", [1u8; 32]).await.unwrap_err();
        assert!(matches!(err, HandshakeError::AlreadyAuthenticated));
    }

    #[tokio::test]
    async fn circuit_count_never_exceeds_the_cap() {
        let table = SessionTable::new(2);
        table.register("peer-1".into(), "addr".into()).await;
        table.authenticate("peer-1", [0u8; 32]).await.unwrap();

        table.try_reserve_circuit("peer-1").await.unwrap();
        table.try_reserve_circuit("peer-1").await.unwrap();
        let err = table.try_reserve_circuit("peer-1").await.unwrap_err();
        assert!(matches!(err, HandshakeError::TooManyCircuits));
    }

    #[tokio::test]
    async fn release_decreases_count_by_exactly_one() {
        let table = SessionTable::new(4);
        table.register("peer-1".into(), "addr".into()).await;
        table.authenticate("peer-1", [0u8; 32]).await.unwrap();
        table.try_reserve_circuit("peer-1").await.unwrap();
        table.try_reserve_circuit("peer-1").await.unwrap();

        table.release_circuit("peer-1").await;
        table.try_reserve_circuit("peer-1").await.unwrap();
        table.try_reserve_circuit("peer-1").await.unwrap();
        let err = table.try_reserve_circuit("peer-1").await.unwrap_err();
        assert!(matches!(err, HandshakeError::TooManyCircuits));
    }

    #[tokio::test]
    async fn unauthenticated_client_cannot_reserve_a_circuit() {
        let table = SessionTable::new(4);
        table.register("peer-1".into(), "addr".into()).await;
        let err = table.try_reserve_circuit("peer-1").await.unwrap_err();
        assert!(matches!(err, HandshakeError::NotAuthenticated));
    }
}
