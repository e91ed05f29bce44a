//! The flat table of active circuits: one entry per circuit id, with no
//! cross-references between circuits. A circuit is owned by exactly one
//! inbound client connection and has at most one outbound link.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::err::CircuitError;

/// A single onion circuit.
#[derive(Clone, Debug)]
pub struct Circuit {
    pub circuit_id: String,
    pub client_peer: String,
    pub circuit_key: [u8; 32],
    pub next_hop_addr: Option<String>,
    pub next_hop_peer: Option<String>,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub bytes_forwarded: u64,
}

/// Aggregate counters returned by [`CircuitTable::stats`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CircuitTableStats {
    pub active_circuits: usize,
}

/// The shared, reader-writer-locked map of active circuits.
#[derive(Clone)]
pub struct CircuitTable {
    inner: Arc<RwLock<HashMap<String, Circuit>>>,
}

impl CircuitTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Install a freshly created circuit. Fails if `circuit_id` collides
    /// with an existing circuit (only possible for a client-proposed id).
    pub async fn install(
        &self,
        circuit_id: String,
        client_peer: String,
        circuit_key: [u8; 32],
    ) -> Result<(), CircuitError> {
        let mut inner = self.inner.write().await;
        if inner.contains_key(&circuit_id) {
            return Err(CircuitError::AlreadyExists);
        }
        let now = Instant::now();
        inner.insert(
            circuit_id.clone(),
            Circuit {
                circuit_id,
                client_peer,
                circuit_key,
                next_hop_addr: None,
                next_hop_peer: None,
                created_at: now,
                last_activity: now,
                bytes_forwarded: 0,
            },
        );
        Ok(())
    }

    /// Record a successful EXTEND: attach the outbound link to `circuit_id`.
    pub async fn extend(
        &self,
        circuit_id: &str,
        next_hop_addr: String,
        next_hop_peer: String,
    ) -> Result<(), CircuitError> {
        let mut inner = self.inner.write().await;
        let circuit = inner.get_mut(circuit_id).ok_or(CircuitError::NotFound)?;
        circuit.next_hop_addr = Some(next_hop_addr);
        circuit.next_hop_peer = Some(next_hop_peer);
        circuit.last_activity = Instant::now();
        Ok(())
    }

    /// Remove and return a circuit. Idempotent: a second call for the same
    /// id returns `None`.
    pub async fn destroy(&self, circuit_id: &str) -> Option<Circuit> {
        let mut inner = self.inner.write().await;
        inner.remove(circuit_id)
    }

    /// Return a clone of the circuit's current state.
    pub async fn get(&self, circuit_id: &str) -> Option<Circuit> {
        let inner = self.inner.read().await;
        inner.get(circuit_id).cloned()
    }

    /// Update `last_activity` to now.
    pub async fn touch(&self, circuit_id: &str) -> Result<(), CircuitError> {
        let mut inner = self.inner.write().await;
        let circuit = inner.get_mut(circuit_id).ok_or(CircuitError::NotFound)?;
        circuit.last_activity = Instant::now();
        Ok(())
    }

    /// Add to `bytes_forwarded` and refresh `last_activity` in one step.
    pub async fn record_forwarded(&self, circuit_id: &str, bytes: u64) -> Result<(), CircuitError> {
        let mut inner = self.inner.write().await;
        let circuit = inner.get_mut(circuit_id).ok_or(CircuitError::NotFound)?;
        circuit.bytes_forwarded += bytes;
        circuit.last_activity = Instant::now();
        Ok(())
    }

    /// Destroy every circuit idle for longer than `idle_timeout`, returning
    /// what was removed.
    pub async fn sweep_idle(&self, idle_timeout: Duration) -> Vec<Circuit> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let stale: Vec<String> = inner
            .iter()
            .filter(|(_, c)| now.saturating_duration_since(c.last_activity) > idle_timeout)
            .map(|(id, _)| id.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|id| inner.remove(&id))
            .collect()
    }

    /// Run [`CircuitTable::sweep_idle`] on `interval` until `shutdown`
    /// resolves to `true`.
    pub async fn run_idle_gc_loop(
        &self,
        interval: Duration,
        idle_timeout: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep_idle(idle_timeout).await;
                    if !removed.is_empty() {
                        debug!(removed = removed.len(), "idle circuit GC swept stale circuits");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    pub async fn stats(&self) -> CircuitTableStats {
        let inner = self.inner.read().await;
        CircuitTableStats {
            active_circuits: inner.len(),
        }
    }
}

impl Default for CircuitTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_then_extend_attaches_outbound_link() {
        let table = CircuitTable::new();
        table
            .install("a".repeat(32), "client-1".into(), [0u8; 32])
            .await
            .unwrap();
        table
            .extend(&"a".repeat(32), "ws://next-hop".into(), "link-1".into())
            .await
            .unwrap();

        let circuit = table.get(&"a".repeat(32)).await.unwrap();
        assert_eq!(circuit.next_hop_addr.as_deref(), Some("ws://next-hop"));
        assert_eq!(circuit.next_hop_peer.as_deref(), Some("link-1"));
    }

    #[tokio::test]
    async fn duplicate_circuit_id_is_rejected() {
        let table = CircuitTable::new();
        table.install("id".into(), "c1".into(), [1u8; 32]).await.unwrap();
        let err = table.install("id".into(), "c1".into(), [2u8; 32]).await.unwrap_err();
        assert_eq!(err, CircuitError::AlreadyExists);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let table = CircuitTable::new();
        table.install("id".into(), "c1".into(), [1u8; 32]).await.unwrap();
        assert!(table.destroy("id").await.is_some());
        assert!(table.destroy("id").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_idle_removes_only_stale_circuits() {
        let table = CircuitTable::new();
        table.install("stale".into(), "c1".into(), [1u8; 32]).await.unwrap();
        tokio::time::advance(Duration::from_secs(700)).await;
        table.install("fresh".into(), "c2".into(), [2u8; 32]).await.unwrap();

        let removed = table.sweep_idle(Duration::from_secs(600)).await;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].circuit_id, "stale");
        assert_eq!(table.stats().await.active_circuits, 1);
    }

    #[tokio::test]
    async fn record_forwarded_accumulates_bytes() {
        let table = CircuitTable::new();
        table.install("id".into(), "c1".into(), [1u8; 32]).await.unwrap();
        table.record_forwarded("id", 100).await.unwrap();
        table.record_forwarded("id", 50).await.unwrap();
        assert_eq!(table.get("id").await.unwrap().bytes_forwarded, 150);
    }
}
