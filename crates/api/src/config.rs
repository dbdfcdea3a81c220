use std::str::FromStr;
use std::time::Duration;

use bench_core::types::Millis;
use bench_engine::cache::CacheBackend;
use bench_engine::EngineConfig;

/// A configuration variable that is present but unparseable.
#[derive(Debug, thiserror::Error)]
#[error("{key} is invalid: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `55555`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Seconds between WebSocket pings and heartbeat events (default: `30`).
    pub heartbeat_interval_secs: u64,
    /// Where ephemeral bench state lives (default: Postgres).
    pub cache_backend: CacheBackend,
    /// Bench timer and batching settings.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `55555`                 |
    /// | `CORS_ORIGINS`            | `http://localhost:1212` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`                    |
    /// | `CACHE_BACKEND`           | `postgres`              |
    /// | `PENDING_MAX_TIME_MS`     | `900000`                |
    /// | `TIMER_TICK_MS`           | `1000`                  |
    /// | `BATCH_WINDOW_MS`         | `250`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:1212".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "PORT", 55555)?,
            cors_origins,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            heartbeat_interval_secs: parse_or(&lookup, "HEARTBEAT_INTERVAL_SECS", 30)?,
            cache_backend: parse_or(&lookup, "CACHE_BACKEND", CacheBackend::Postgres)?,
            engine: EngineConfig {
                pending_max_time_ms: positive_or(
                    &lookup,
                    "PENDING_MAX_TIME_MS",
                    defaults.pending_max_time_ms,
                )?,
                tick_ms: positive_or(&lookup, "TIMER_TICK_MS", defaults.tick_ms)?,
                batch_window_ms: positive_or(&lookup, "BATCH_WINDOW_MS", defaults.batch_window_ms)?,
            },
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], for durations in milliseconds that must be above zero.
fn positive_or<F>(lookup: &F, key: &'static str, default: Millis) -> Result<Millis, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if value <= 0 {
        return Err(ConfigError {
            key,
            reason: format!("must be greater than zero, got {value}"),
        });
    }
    Ok(value)
}
