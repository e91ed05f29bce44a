//! The relay directory entry and its public, API-facing projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A relay's declared role in the network.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    Entry,
    Middle,
    Exit,
}

/// A registered relay, as held by the directory.
///
/// Invariants (enforced by [`crate::registry::DirectoryRegistry`], not by
/// this type): `registered_at <= last_seen`; `online == true` implies
/// `now - last_seen <= stale_threshold`; `trust_score` is set once at
/// registration and only ever increases afterward, capped at 100.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayEntry {
    pub id: String,
    pub public_key: String,
    pub endpoint: String,
    pub mode: RelayMode,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub max_bandwidth: u64,
    pub current_load: f64,
    pub uptime_seconds: u64,
    pub last_seen: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    pub trust_score: f64,
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
}

/// The subset of an entry returned by the filtered listing endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelaySummary {
    pub id: String,
    pub endpoint: String,
    pub mode: RelayMode,
    pub version: String,
    pub capabilities: Vec<String>,
    pub max_bandwidth: u64,
    pub trust_score: f64,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
}

impl From<&RelayEntry> for RelaySummary {
    fn from(entry: &RelayEntry) -> Self {
        Self {
            id: entry.id.clone(),
            endpoint: entry.endpoint.clone(),
            mode: entry.mode,
            version: entry.version.clone(),
            capabilities: entry.capabilities.clone(),
            max_bandwidth: entry.max_bandwidth,
            trust_score: entry.trust_score,
            online: entry.online,
            country: entry.country.clone(),
            asn: entry.asn,
        }
    }
}

/// The subset of an entry returned by `/relays/{id}/health`.
#[derive(Clone, Debug, Serialize)]
pub struct RelayHealth {
    pub id: String,
    pub online: bool,
    pub last_seen: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub current_load: f64,
}

impl From<&RelayEntry> for RelayHealth {
    fn from(entry: &RelayEntry) -> Self {
        Self {
            id: entry.id.clone(),
            online: entry.online,
            last_seen: entry.last_seen,
            uptime_seconds: entry.uptime_seconds,
            current_load: entry.current_load,
        }
    }
}

/// Body of `POST /relays/register`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub id: String,
    pub public_key: String,
    pub endpoint: String,
    pub mode: RelayMode,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub max_bandwidth: u64,
    #[serde(default)]
    pub current_load: f64,
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub asn: Option<u32>,
}

/// Body of `PUT /relays/register` (heartbeat).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub id: String,
    #[serde(default)]
    pub current_load: f64,
    #[serde(default)]
    pub uptime_seconds: u64,
}

/// Query parameters accepted by `GET /relays`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListFilter {
    pub mode: Option<RelayMode>,
    pub online: Option<bool>,
    pub min_trust: Option<f64>,
}

/// Body of `GET /stats`.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DirectoryStats {
    pub total_relays: usize,
    pub online_relays: usize,
    pub by_mode: std::collections::HashMap<String, usize>,
    pub uptime_seconds: u64,
}

/// Compute the write-once initial trust score for a new registration.
pub fn initial_trust_score(capabilities: &[String], version: &str) -> f64 {
    let version_bonus = if version.is_empty() { 0.0 } else { 5.0 };
    (50.0 + 2.0 * capabilities.len() as f64 + version_bonus).min(70.0)
}
