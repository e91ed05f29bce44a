//! Layered configuration: compiled-in defaults < YAML file < environment
//! variables < CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::{Cli, RelayMode};
use crate::err::RelayError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub keystore_path: PathBuf,
    pub max_circuits_per_client: u32,
    pub circuit_idle_timeout_secs: u64,
    pub max_onion_message_bytes: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9001,
            keystore_path: PathBuf::from("relay.key"),
            max_circuits_per_client: 16,
            circuit_idle_timeout_secs: 600,
            max_onion_message_bytes: 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub max_rooms: usize,
    pub default_expiry_secs: u64,
    pub max_expiry_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_rooms: 10_000,
            default_expiry_secs: 24 * 3600,
            max_expiry_secs: 24 * 3600,
            cleanup_interval_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub rps: u32,
    pub burst: u32,
    pub max_violations: u32,
    pub ban_duration_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 10,
            burst: 20,
            max_violations: 5,
            ban_duration_secs: 3600,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub read_deadline_secs: u64,
    pub max_bytes: u64,
    pub idle_timeout_secs: u64,
    pub ping_interval_secs: u64,
    pub pong_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            read_deadline_secs: 60,
            max_bytes: 10 * 1024 * 1024 * 1024,
            idle_timeout_secs: 300,
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

/// The fully resolved, immutable configuration for one relay process.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub mode: String,
    pub relay_id: Option<String>,
    pub directory_url: Option<String>,
    pub region: Option<String>,
    pub log_level: String,
    pub log_format: String,
    pub server: ServerConfig,
    pub room: RoomConfig,
    pub rate_limit: RateLimitConfig,
    pub bridge: BridgeConfig,
    pub tls: TlsConfig,
    pub metrics: MetricsConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: "entry".to_string(),
            relay_id: None,
            directory_url: None,
            region: None,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            server: ServerConfig::default(),
            room: RoomConfig::default(),
            rate_limit: RateLimitConfig::default(),
            bridge: BridgeConfig::default(),
            tls: TlsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn circuit_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.server.circuit_idle_timeout_secs)
    }
}

/// Resolve a [`RelayConfig`] from the file named by `cli.config` (if any),
/// then environment variables, then `cli`'s own flags and `--option`
/// overrides.
pub fn load(cli: &Cli) -> Result<RelayConfig, RelayError> {
    let mut builder = config::Config::builder();

    if let Some(path) = &cli.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    } else {
        let default_path = Path::new("tallow-relay.yaml");
        if default_path.exists() {
            builder = builder.add_source(config::File::from(default_path));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RELAY")
            .separator("__")
            .try_parsing(true),
    );

    for (key, value) in &cli.options {
        builder = builder.set_override(key.as_str(), value.as_str()).map_err(|e| {
            RelayError::Config(format!("invalid --option {key}={value}: {e}"))
        })?;
    }

    let settled = builder
        .build()
        .map_err(|e| RelayError::Config(e.to_string()))?;
    let mut cfg: RelayConfig = settled
        .try_deserialize()
        .map_err(|e| RelayError::Config(e.to_string()))?;

    apply_named_env_overrides(&mut cfg);
    apply_cli_overrides(&mut cfg, cli);

    Ok(cfg)
}

/// Apply the specific environment variable names the external interface
/// documents (in addition to the generic `RELAY__*` nesting above).
fn apply_named_env_overrides(cfg: &mut RelayConfig) {
    if let Ok(v) = std::env::var("LOG_LEVEL") {
        cfg.log_level = v;
    }
    if let Ok(v) = std::env::var("LOG_FORMAT") {
        cfg.log_format = v;
    }
    if let Ok(v) = std::env::var("RELAY_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = parse_env("RELAY_PORT") {
        cfg.server.port = v;
    }
    if let Some(v) = parse_env("RELAY_MAX_ROOMS") {
        cfg.room.max_rooms = v;
    }
    if let Some(v) = parse_duration_env("RELAY_ROOM_EXPIRY") {
        cfg.room.default_expiry_secs = v;
    }
    if let Some(v) = parse_bool_env("RELAY_RATE_LIMIT_ENABLED") {
        cfg.rate_limit.enabled = v;
    }
    if let Some(v) = parse_env("RELAY_RATE_LIMIT_RPS") {
        cfg.rate_limit.rps = v;
    }
    if let Some(v) = parse_bool_env("RELAY_TLS_ENABLED") {
        cfg.tls.enabled = v;
    }
    if let Ok(v) = std::env::var("RELAY_TLS_CERT") {
        cfg.tls.cert_path = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("RELAY_TLS_KEY") {
        cfg.tls.key_path = Some(PathBuf::from(v));
    }
    if let Some(v) = parse_bool_env("RELAY_METRICS_ENABLED") {
        cfg.metrics.enabled = v;
    }
    if let Some(v) = parse_env("RELAY_METRICS_PORT") {
        cfg.metrics.port = v;
    }
    if let Ok(v) = std::env::var("RELAY_ROLE") {
        cfg.mode = v;
    }
    if let Ok(v) = std::env::var("RELAY_REGION") {
        cfg.region = Some(v);
    }
    if let Ok(v) = std::env::var("RELAY_DIRECTORY_URL") {
        cfg.directory_url = Some(v);
    }
}

fn apply_cli_overrides(cfg: &mut RelayConfig, cli: &Cli) {
    if let Some(mode) = cli.mode {
        cfg.mode = mode.to_string();
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }
    if let Some(directory) = &cli.directory {
        cfg.directory_url = Some(directory.clone());
    }
    if let Some(id) = &cli.id {
        cfg.relay_id = Some(id.clone());
    }
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_bool_env(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| matches!(v.as_str(), "true" | "1"))
}

/// Parse a plain-integer-seconds or `<n><unit>` duration string
/// (`30s`, `5m`, `2h`) into seconds.
fn parse_duration_env(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }
    let (digits, unit) = raw.split_at(raw.len().saturating_sub(1));
    let value: u64 = digits.parse().ok()?;
    match unit {
        "s" => Some(value),
        "m" => Some(value * 60),
        "h" => Some(value * 3600),
        _ => None,
    }
}

impl RelayMode {
    pub fn is_directory(self) -> bool {
        matches!(self, RelayMode::Directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.server.port, 9001);
        assert_eq!(cfg.room.max_rooms, 10_000);
        assert_eq!(cfg.rate_limit.rps, 10);
        assert_eq!(cfg.bridge.max_bytes, 10 * 1024 * 1024 * 1024);
        assert_eq!(cfg.metrics.port, 9090);
    }

    #[test]
    fn duration_env_parses_unit_suffixes() {
        std::env::set_var("TEST_DURATION_ONE", "45");
        std::env::set_var("TEST_DURATION_TWO", "5m");
        assert_eq!(parse_duration_env("TEST_DURATION_ONE"), Some(45));
        assert_eq!(parse_duration_env("TEST_DURATION_TWO"), Some(300));
        std::env::remove_var("TEST_DURATION_ONE");
        std::env::remove_var("TEST_DURATION_TWO");
    }
}
