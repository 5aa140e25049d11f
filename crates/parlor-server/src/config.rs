//! Server configuration with file loading and env var overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ServerConfig::default()`]
//! 2. If a config file is given and exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use parlor_session::MovePolicy;

/// Configuration for the parlor server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `8000`, `0` for auto-assign).
    pub port: u16,
    /// Move policing applied to every session.
    pub move_policy: MovePolicy,
    /// Heartbeat ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Heartbeat timeout in seconds (close after this long without a pong).
    pub heartbeat_timeout_secs: u64,
    /// Sessions idle for longer than this with no attached connections are
    /// dropped by the expiry sweeper.
    pub session_retention_secs: u64,
    /// Interval between expiry sweeps in seconds.
    pub sweep_interval_secs: u64,
    /// Outbound send queue capacity per connection.
    pub send_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            move_policy: MovePolicy::default(),
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            session_retention_secs: 600,
            sweep_interval_secs: 60,
            send_queue_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Heartbeat ping interval.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Heartbeat timeout.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Idle retention before an unattended session expires.
    #[must_use]
    pub fn session_retention(&self) -> Duration {
        Duration::from_secs(self.session_retention_secs)
    }

    /// Interval between expiry sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON or does not match the schema.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load configuration from a JSON file with env var overrides.
///
/// If the file does not exist, returns defaults (still applying env
/// overrides). If the file contains invalid JSON, returns an error.
pub fn load_config_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    let defaults = serde_json::to_value(ServerConfig::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    let mut config: ServerConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Recursively merge `source` over `target`.
///
/// Objects merge per key; anything else in `source` replaces the target
/// value wholesale. Nulls in `source` are skipped so a sparse file never
/// erases a default.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to a loaded config.
///
/// Integer vars must parse and fall inside their range; invalid values are
/// ignored (fall back to file/default).
pub fn apply_env_overrides(config: &mut ServerConfig) {
    if let Some(v) = read_env_string("PARLOR_HOST") {
        config.host = v;
    }
    if let Some(v) = read_env_u16("PARLOR_PORT", 1, 65535) {
        config.port = v;
    }
    if let Some(v) = read_env_string("PARLOR_MOVE_POLICY") {
        if let Ok(policy) = serde_json::from_value(Value::String(v)) {
            config.move_policy = policy;
        }
    }
    if let Some(v) = read_env_u64("PARLOR_HEARTBEAT_INTERVAL", 1, 600) {
        config.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_env_u64("PARLOR_HEARTBEAT_TIMEOUT", 1, 3600) {
        config.heartbeat_timeout_secs = v;
    }
    if let Some(v) = read_env_u64("PARLOR_SESSION_RETENTION", 1, 86_400) {
        config.session_retention_secs = v;
    }
    if let Some(v) = read_env_u64("PARLOR_SWEEP_INTERVAL", 1, 3600) {
        config.sweep_interval_secs = v;
    }
    if let Some(v) = read_env_usize("PARLOR_SEND_QUEUE_CAPACITY", 1, 65_536) {
        config.send_queue_capacity = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
