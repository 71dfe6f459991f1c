//! Application configuration loaded from environment variables.

use std::time::Duration;

use bus::RetryPolicy;

/// Server and bus configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `BUS_PARTITIONS` — partitions per channel (default: `8`)
/// - `BUS_RETRY_BACKOFF_MS` — redelivery backoff (default: `5000`)
/// - `BUS_MAX_ATTEMPTS` — delivery attempts per message (default: `4`)
/// - `SETTLEMENT_TIMEOUT_MS` — settlement call timeout (default: `5000`)
/// - `PUBLISH_TIMEOUT_MS` — command publish timeout (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub bus_partitions: usize,
    pub retry_backoff_ms: u64,
    pub max_attempts: u32,
    pub settlement_timeout_ms: u64,
    pub publish_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parsed("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            bus_partitions: env_parsed("BUS_PARTITIONS").unwrap_or(defaults.bus_partitions),
            retry_backoff_ms: env_parsed("BUS_RETRY_BACKOFF_MS")
                .unwrap_or(defaults.retry_backoff_ms),
            max_attempts: env_parsed("BUS_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            settlement_timeout_ms: env_parsed("SETTLEMENT_TIMEOUT_MS")
                .unwrap_or(defaults.settlement_timeout_ms),
            publish_timeout_ms: env_parsed("PUBLISH_TIMEOUT_MS")
                .unwrap_or(defaults.publish_timeout_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the bus redelivery policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.retry_backoff_ms),
            self.max_attempts,
        )
    }

    /// Returns the settlement call timeout.
    pub fn settlement_timeout(&self) -> Duration {
        Duration::from_millis(self.settlement_timeout_ms)
    }

    /// Returns the command/event publish timeout.
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            bus_partitions: 8,
            retry_backoff_ms: 5000,
            max_attempts: 4,
            settlement_timeout_ms: 5000,
            publish_timeout_ms: 5000,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
