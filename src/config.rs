//! Process configuration loaded from environment variables.
//!
//! DESIGN
//! ======
//! Only `DATABASE_URL` is required. Every tuning knob falls back to a
//! default when unset or unparsable, so a bare `.env` with a database URL
//! is enough to boot a development server.

use std::time::Duration;

use crate::event::ErrorCode;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_WS_QUEUE_CAPACITY: usize = 256;
const DEFAULT_HUB_COMMAND_CAPACITY: usize = 1024;
const DEFAULT_WS_PING_INTERVAL_SECS: u64 = 30;
const DEFAULT_MUTATION_RETRIES: usize = 3;
const DEFAULT_MUTATION_RETRY_BASE_MS: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} required")]
    Missing(&'static str),
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

/// Retry policy for retryable storage failures (deadlocks, serialization
/// failures, concurrent parent changes).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub attempts: usize,
    /// Linear back-off step: attempt `n` sleeps `n * base` before retrying.
    pub base: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn backoff(&self, attempt: usize) -> Duration {
        self.base * u32::try_from(attempt).unwrap_or(u32::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_MUTATION_RETRIES,
            base: Duration::from_millis(DEFAULT_MUTATION_RETRY_BASE_MS),
        }
    }
}

/// Tuning for the fan-out hub and per-connection transport.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Outbound queue depth per connection. A full queue evicts the connection.
    pub queue_capacity: usize,
    /// Depth of the hub's command channel (register/unregister/publish).
    pub command_capacity: usize,
    /// Interval between websocket pings sent by the connection writer.
    pub ping_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_WS_QUEUE_CAPACITY,
            command_capacity: DEFAULT_HUB_COMMAND_CAPACITY,
            ping_interval: Duration::from_secs(DEFAULT_WS_PING_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub hub: HubConfig,
    pub retry: RetryPolicy,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Missing` when `DATABASE_URL` is unset and `Invalid` when
    /// `PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = match lookup("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let hub = HubConfig {
            queue_capacity: parse_or(lookup("WS_QUEUE_CAPACITY"), DEFAULT_WS_QUEUE_CAPACITY).max(1),
            command_capacity: parse_or(lookup("HUB_COMMAND_CAPACITY"), DEFAULT_HUB_COMMAND_CAPACITY).max(1),
            ping_interval: Duration::from_secs(
                parse_or(lookup("WS_PING_INTERVAL_SECS"), DEFAULT_WS_PING_INTERVAL_SECS).max(1),
            ),
        };
        let retry = RetryPolicy {
            attempts: parse_or(lookup("MUTATION_RETRIES"), DEFAULT_MUTATION_RETRIES).max(1),
            base: Duration::from_millis(parse_or(lookup("MUTATION_RETRY_BASE_MS"), DEFAULT_MUTATION_RETRY_BASE_MS)),
        };

        Ok(Self {
            database_url,
            port,
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS),
            hub,
            retry,
        })
    }
}

fn parse_or<T>(value: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    value.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}
