//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                 | Default                  |
//! |--------------------------|--------------------------|
//! | `LISTEN_ADDR`            | `0.0.0.0:8000`           |
//! | `BROKER`                 | `redis`                  |
//! | `REDIS_URL`              | `redis://127.0.0.1:6379` |
//! | `RELAY_CHANNEL`          | `whiteboard`             |
//! | `CONNECTION_BUFFER`      | `256`                    |
//! | `MEMORY_BROKER_CAPACITY` | `1024`                   |
//! | `LOG_FORMAT`             | `pretty`                 |

use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::RelayError;
use crate::relay::DEFAULT_CHANNEL;

/// Which pub/sub transport the relay runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    /// Redis PUBLISH/SUBSCRIBE; relays across processes.
    Redis,
    /// In-process bus; relays within this process only.
    Memory,
}

impl FromStr for BrokerKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(RelayError::Config(format!(
                "BROKER must be `redis` or `memory`, got `{other}`"
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(RelayError::Config(format!(
                "LOG_FORMAT must be `pretty` or `json`, got `{other}`"
            ))),
        }
    }
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// Pub/sub transport.
    pub broker: BrokerKind,

    /// Redis connection URL, used when `broker` is [`BrokerKind::Redis`].
    pub redis_url: String,

    /// Channel every relay process publishes to and subscribes on.
    pub channel: String,

    /// Outbound queue capacity per connection.
    pub connection_buffer: usize,

    /// Ring size of each [`crate::broker::MemoryBroker`] channel.
    pub memory_broker_capacity: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if a variable is set to a value that
    /// cannot be used.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if a value cannot be used.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| RelayError::Config(format!("LISTEN_ADDR: {e}")))?;

        let broker = lookup("BROKER").as_deref().unwrap_or("redis").parse()?;

        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let channel = lookup("RELAY_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        if channel.trim().is_empty() {
            return Err(RelayError::Config("RELAY_CHANNEL must not be empty".to_string()));
        }

        let connection_buffer = parse_or(&lookup, "CONNECTION_BUFFER", 256);
        if connection_buffer == 0 {
            return Err(RelayError::Config(
                "CONNECTION_BUFFER must be at least 1".to_string(),
            ));
        }

        let memory_broker_capacity = parse_or(&lookup, "MEMORY_BROKER_CAPACITY", 1024).max(1);

        let log_format = lookup("LOG_FORMAT").as_deref().unwrap_or("pretty").parse()?;

        Ok(Self {
            listen_addr,
            broker,
            redis_url,
            channel,
            connection_buffer,
            memory_broker_capacity,
            log_format,
        })
    }
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<RelayConfig, RelayError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RelayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let Ok(config) = load(&[]) else {
            panic!("defaults should load");
        };
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.broker, BrokerKind::Redis);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.channel, "whiteboard");
        assert_eq!(config.connection_buffer, 256);
        assert_eq!(config.memory_broker_capacity, 1024);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_are_applied() {
        let Ok(config) = load(&[
            ("LISTEN_ADDR", "127.0.0.1:9100"),
            ("BROKER", "Memory"),
            ("RELAY_CHANNEL", "board-2"),
            ("CONNECTION_BUFFER", "8"),
            ("LOG_FORMAT", "json"),
        ]) else {
            panic!("overrides should load");
        };
        assert_eq!(config.listen_addr.port(), 9100);
        assert_eq!(config.broker, BrokerKind::Memory);
        assert_eq!(config.channel, "board-2");
        assert_eq!(config.connection_buffer, 8);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_listen_addr_is_rejected() {
        assert!(matches!(
            load(&[("LISTEN_ADDR", "not-an-addr")]),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn unknown_broker_is_rejected() {
        assert!(matches!(
            load(&[("BROKER", "kafka")]),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn empty_channel_is_rejected() {
        assert!(matches!(
            load(&[("RELAY_CHANNEL", "  ")]),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn zero_connection_buffer_is_rejected() {
        assert!(matches!(
            load(&[("CONNECTION_BUFFER", "0")]),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn unparsable_number_falls_back_to_default() {
        let Ok(config) = load(&[("MEMORY_BROKER_CAPACITY", "lots")]) else {
            panic!("should fall back");
        };
        assert_eq!(config.memory_broker_capacity, 1024);
    }
}
