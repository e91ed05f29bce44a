//! The directory's relay table: registration, heartbeats, queries, and
//! the staleness GC sweep.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{watch, RwLock};
use tokio::time::Duration;
use tracing::{debug, info};

use crate::err::DirectoryError;
use crate::model::{initial_trust_score, DirectoryStats, ListFilter, RegisterRequest, RelayEntry};

/// Tunables for a [`DirectoryRegistry`].
#[derive(Clone, Copy, Debug)]
pub struct DirectoryConfig {
    /// A relay is marked offline once `now - last_seen` exceeds this.
    pub stale_threshold: ChronoDuration,
    /// A relay is deleted once `now - last_seen` exceeds this.
    pub gc_threshold: ChronoDuration,
    /// How often the background GC loop runs.
    pub gc_interval: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            stale_threshold: ChronoDuration::minutes(2),
            gc_threshold: ChronoDuration::minutes(10),
            gc_interval: Duration::from_secs(60),
        }
    }
}

/// Outcome of a single GC pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GcOutcome {
    pub marked_offline: usize,
    pub deleted: usize,
}

struct Inner {
    relays: HashMap<String, RelayEntry>,
}

/// The shared, reader-writer-locked relay directory.
#[derive(Clone)]
pub struct DirectoryRegistry {
    config: DirectoryConfig,
    inner: Arc<RwLock<Inner>>,
    started_at: DateTime<Utc>,
}

impl DirectoryRegistry {
    pub fn new(config: DirectoryConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(Inner {
                relays: HashMap::new(),
            })),
            started_at: now,
        }
    }

    /// Create or update a relay entry. Re-registration preserves
    /// `registered_at` and `trust_score`.
    pub async fn register(
        &self,
        req: RegisterRequest,
        now: DateTime<Utc>,
    ) -> Result<RelayEntry, DirectoryError> {
        validate_registration(&req)?;

        let mut inner = self.inner.write().await;
        let entry = if let Some(existing) = inner.relays.get(&req.id) {
            RelayEntry {
                id: req.id.clone(),
                public_key: req.public_key,
                endpoint: req.endpoint,
                mode: req.mode,
                version: req.version,
                capabilities: req.capabilities,
                max_bandwidth: req.max_bandwidth,
                current_load: req.current_load,
                uptime_seconds: req.uptime_seconds,
                last_seen: now,
                registered_at: existing.registered_at,
                trust_score: existing.trust_score,
                online: true,
                country: req.country,
                asn: req.asn,
            }
        } else {
            let trust_score = initial_trust_score(&req.capabilities, &req.version);
            RelayEntry {
                id: req.id.clone(),
                public_key: req.public_key,
                endpoint: req.endpoint,
                mode: req.mode,
                version: req.version,
                capabilities: req.capabilities,
                max_bandwidth: req.max_bandwidth,
                current_load: req.current_load,
                uptime_seconds: req.uptime_seconds,
                last_seen: now,
                registered_at: now,
                trust_score,
                online: true,
                country: req.country,
                asn: req.asn,
            }
        };

        inner.relays.insert(req.id.clone(), entry.clone());
        info!(relay_id = %req.id, mode = ?entry.mode, "relay registered");
        Ok(entry)
    }

    /// Record a heartbeat: refreshes liveness and nudges trust upward.
    pub async fn heartbeat(
        &self,
        id: &str,
        current_load: f64,
        uptime_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<RelayEntry, DirectoryError> {
        let mut inner = self.inner.write().await;
        let entry = inner.relays.get_mut(id).ok_or(DirectoryError::NotFound)?;
        entry.last_seen = now;
        entry.current_load = current_load.clamp(0.0, 100.0);
        entry.uptime_seconds = uptime_seconds;
        entry.online = true;
        entry.trust_score = (entry.trust_score + 0.01).min(100.0);
        Ok(entry.clone())
    }

    /// Fetch a single entry, with `online` recomputed against `now`.
    pub async fn get(&self, id: &str, now: DateTime<Utc>) -> Option<RelayEntry> {
        let inner = self.inner.read().await;
        inner
            .relays
            .get(id)
            .map(|entry| self.with_effective_online(entry, now))
    }

    /// List entries matching `filter`, sorted by `trust_score` descending.
    pub async fn list(&self, filter: ListFilter, now: DateTime<Utc>) -> Vec<RelayEntry> {
        let inner = self.inner.read().await;
        let mut entries: Vec<RelayEntry> = inner
            .relays
            .values()
            .map(|entry| self.with_effective_online(entry, now))
            .filter(|entry| filter.mode.map_or(true, |m| m == entry.mode))
            .filter(|entry| filter.online.map_or(true, |want| want == entry.online))
            .filter(|entry| filter.min_trust.map_or(true, |min| entry.trust_score >= min))
            .collect();
        entries.sort_by(|a, b| b.trust_score.total_cmp(&a.trust_score));
        entries
    }

    /// Permanently remove an entry. Returns whether one existed.
    pub async fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.write().await;
        inner.relays.remove(id).is_some()
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> DirectoryStats {
        let inner = self.inner.read().await;
        let mut by_mode = HashMap::new();
        let mut online_relays = 0;
        for entry in inner.relays.values() {
            let effective = self.with_effective_online(entry, now);
            *by_mode.entry(mode_key(effective.mode).to_string()).or_insert(0) += 1;
            if effective.online {
                online_relays += 1;
            }
        }
        DirectoryStats {
            total_relays: inner.relays.len(),
            online_relays,
            by_mode,
            uptime_seconds: (now - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Mark stale entries offline and delete entries past `gc_threshold`.
    pub async fn gc_sweep(&self, now: DateTime<Utc>) -> GcOutcome {
        let mut inner = self.inner.write().await;
        let mut outcome = GcOutcome::default();

        let to_delete: Vec<String> = inner
            .relays
            .values()
            .filter(|e| now - e.last_seen > self.config.gc_threshold)
            .map(|e| e.id.clone())
            .collect();
        for id in &to_delete {
            inner.relays.remove(id);
        }
        outcome.deleted = to_delete.len();

        for entry in inner.relays.values_mut() {
            let stale = now - entry.last_seen > self.config.stale_threshold;
            if stale && entry.online {
                entry.online = false;
                outcome.marked_offline += 1;
            }
        }

        outcome
    }

    /// Run [`DirectoryRegistry::gc_sweep`] on `config.gc_interval` until
    /// `shutdown` resolves to `true`.
    pub async fn run_gc_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.gc_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.gc_sweep(Utc::now()).await;
                    if outcome.marked_offline > 0 || outcome.deleted > 0 {
                        debug!(?outcome, "directory GC sweep");
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

    fn with_effective_online(&self, entry: &RelayEntry, now: DateTime<Utc>) -> RelayEntry {
        let mut clone = entry.clone();
        if clone.online && now - clone.last_seen > self.config.stale_threshold {
            clone.online = false;
        }
        clone
    }
}

fn mode_key(mode: crate::model::RelayMode) -> &'static str {
    use crate::model::RelayMode;
    match mode {
        RelayMode::Entry => "entry",
        RelayMode::Middle => "middle",
        RelayMode::Exit => "exit",
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<(), DirectoryError> {
    if req.id.trim().is_empty() {
        return Err(DirectoryError::InvalidRegistration {
            reason: "id is required".into(),
        });
    }
    if req.endpoint.trim().is_empty() {
        return Err(DirectoryError::InvalidRegistration {
            reason: "endpoint is required".into(),
        });
    }
    if req.public_key.trim().is_empty() {
        return Err(DirectoryError::InvalidRegistration {
            reason: "public_key must not be empty".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelayMode;

    fn req(id: &str, mode: RelayMode) -> RegisterRequest {
        RegisterRequest {
            id: id.into(),
            public_key: "deadbeef".into(),
            endpoint: "wss://relay.example:9001".into(),
            mode,
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
    async fn initial_trust_score_is_capped_at_seventy() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let entry = registry.register(req("r1", RelayMode::Entry), Utc::now()).await.unwrap();
        assert!(entry.trust_score <= 70.0);
        assert!(entry.trust_score > 0.0);
    }

    #[tokio::test]
    async fn reregistration_preserves_registered_at_and_trust_score() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let t0 = Utc::now();
        let first = registry.register(req("r1", RelayMode::Entry), t0).await.unwrap();

        let t1 = t0 + ChronoDuration::seconds(30);
        let second = registry.register(req("r1", RelayMode::Entry), t1).await.unwrap();

        assert_eq!(second.registered_at, first.registered_at);
        assert_eq!(second.trust_score, first.trust_score);
        assert_eq!(second.last_seen, t1);
    }

    #[tokio::test]
    async fn heartbeat_moves_trust_strictly_upward_and_caps_at_100() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let t0 = Utc::now();
        let entry = registry.register(req("r1", RelayMode::Entry), t0).await.unwrap();
        let start = entry.trust_score;

        let mut last = start;
        for i in 1..=5000 {
            let updated = registry
                .heartbeat("r1", 10.0, i, t0 + ChronoDuration::seconds(i as i64))
                .await
                .unwrap();
            assert!(updated.trust_score >= last);
            last = updated.trust_score;
        }
        assert!(last <= 100.0);
    }

    #[tokio::test]
    async fn gc_sweep_marks_offline_then_deletes() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let t0 = Utc::now();
        registry.register(req("r1", RelayMode::Entry), t0).await.unwrap();

        let t_stale = t0 + ChronoDuration::minutes(2) + ChronoDuration::seconds(1);
        let entry = registry.get("r1", t_stale).await.unwrap();
        assert!(!entry.online);

        let outcome = registry.gc_sweep(t_stale).await;
        assert_eq!(outcome.marked_offline, 1);
        assert_eq!(outcome.deleted, 0);

        let t_gone = t0 + ChronoDuration::minutes(11);
        let outcome = registry.gc_sweep(t_gone).await;
        assert_eq!(outcome.deleted, 1);
        assert!(registry.get("r1", t_gone).await.is_none());

        let stats = registry.stats(t_gone).await;
        assert_eq!(stats.total_relays, 0);
    }

    #[tokio::test]
    async fn list_is_sorted_by_trust_descending() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let now = Utc::now();
        registry.register(req("low", RelayMode::Exit), now).await.unwrap();
        registry.heartbeat("low", 0.0, 0, now).await.unwrap();

        let mut high_req = req("high", RelayMode::Exit);
        high_req.capabilities = vec!["a".into(), "b".into(), "c".into()];
        registry.register(high_req, now).await.unwrap();

        let listed = registry.list(ListFilter::default(), now).await;
        assert!(listed[0].trust_score >= listed[1].trust_score);
    }

    #[tokio::test]
    async fn rejects_registration_missing_required_fields() {
        let registry = DirectoryRegistry::new(DirectoryConfig::default(), Utc::now());
        let mut bad = req("", RelayMode::Entry);
        bad.id = "".into();
        let err = registry.register(bad, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidRegistration { .. }));
    }
}
