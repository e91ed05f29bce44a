//! `reqwest`-based client a relay process uses to register itself with
//! and query the directory.

use std::time::Duration as StdDuration;

use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::err::DirectoryClientError;
use crate::model::{DirectoryStats, HeartbeatRequest, ListFilter, RegisterRequest, RelayEntry, RelaySummary};

const REGISTER_ATTEMPTS: u32 = 5;

/// Configuration for the background heartbeat task.
#[derive(Clone, Copy, Debug)]
pub struct HeartbeatConfig {
    pub warm_up: StdDuration,
    pub interval: StdDuration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            warm_up: StdDuration::from_secs(5),
            interval: StdDuration::from_secs(30),
        }
    }
}

/// Thin wrapper over a [`reqwest::Client`] pointed at a directory base URL.
#[derive(Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Register with the directory, retrying up to [`REGISTER_ATTEMPTS`]
    /// times with a linearly increasing backoff (`5 * attempt` seconds)
    /// between tries.
    pub async fn register_with_retry(
        &self,
        req: &RegisterRequest,
    ) -> Result<RelayEntry, DirectoryClientError> {
        let mut last_err = None;
        for attempt in 1..=REGISTER_ATTEMPTS {
            match self.register(req).await {
                Ok(entry) => return Ok(entry),
                Err(err) => {
                    warn!(attempt, error = %err, "directory registration attempt failed");
                    last_err = Some(err);
                    if attempt < REGISTER_ATTEMPTS {
                        sleep(Duration::from_secs(5 * attempt as u64)).await;
                    }
                }
            }
        }
        Err(last_err.expect("loop runs at least once"))
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<RelayEntry, DirectoryClientError> {
        let resp = self
            .http
            .post(format!("{}/relays/register", self.base_url))
            .json(req)
            .send()
            .await?;
        into_json(resp).await
    }

    pub async fn heartbeat(&self, req: &HeartbeatRequest) -> Result<RelayEntry, DirectoryClientError> {
        let resp = self
            .http
            .put(format!("{}/relays/register", self.base_url))
            .json(req)
            .send()
            .await?;
        into_json(resp).await
    }

    pub async fn list_relays(&self, filter: &ListFilter) -> Result<Vec<RelaySummary>, DirectoryClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(mode) = filter.mode {
            query.push(("mode", format!("{mode:?}").to_lowercase()));
        }
        if let Some(online) = filter.online {
            query.push(("online", online.to_string()));
        }
        if let Some(min_trust) = filter.min_trust {
            query.push(("min_trust", min_trust.to_string()));
        }

        let resp = self
            .http
            .get(format!("{}/relays", self.base_url))
            .query(&query)
            .send()
            .await?;
        into_json(resp).await
    }

    pub async fn get_relay(&self, id: &str) -> Result<RelayEntry, DirectoryClientError> {
        let resp = self
            .http
            .get(format!("{}/relays/{}", self.base_url, id))
            .send()
            .await?;
        into_json(resp).await
    }

    pub async fn stats(&self) -> Result<DirectoryStats, DirectoryClientError> {
        let resp = self.http.get(format!("{}/stats", self.base_url)).send().await?;
        into_json(resp).await
    }

    /// Run a heartbeat loop until `shutdown` resolves to `true`. Loss of
    /// connectivity is logged and retried on the next tick, never fatal.
    pub async fn run_heartbeat_loop(
        &self,
        relay_id: String,
        config: HeartbeatConfig,
        current_load: impl Fn() -> (f64, u64) + Send + Sync + 'static,
        mut shutdown: watch::Receiver<bool>,
    ) {
        sleep(config.warm_up).await;
        let mut ticker = tokio::time::interval(config.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let (load, uptime) = current_load();
                    let req = HeartbeatRequest {
                        id: relay_id.clone(),
                        current_load: load,
                        uptime_seconds: uptime,
                    };
                    match self.heartbeat(&req).await {
                        Ok(_) => info!(relay_id = %relay_id, "heartbeat sent"),
                        Err(err) => warn!(relay_id = %relay_id, error = %err, "heartbeat failed"),
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
}

async fn into_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, DirectoryClientError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(DirectoryClientError::Http(status.as_u16()));
    }
    resp.json::<T>()
        .await
        .map_err(|err| DirectoryClientError::Decode(err.to_string()))
}
