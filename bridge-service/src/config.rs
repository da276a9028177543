use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Bridge configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Kafka brokers (comma-separated)
    pub bootstrap_servers: String,
    /// CDC topic to consume
    pub topic: String,
    /// Kafka consumer group id
    pub group_id: String,
    /// Stream store URL
    pub redis_url: String,
    /// Stream key override; defaults to the topic name
    pub stream_key: Option<String>,
    /// Deadline for dependencies to become reachable at startup
    pub startup_timeout: Duration,
    /// HTTP port for health and metrics
    pub port: u16,
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bootstrap_servers: env::var("KAFKA_BOOTSTRAP_SERVERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            topic: env::var("KAFKA_TOPIC")
                .unwrap_or_else(|_| "dbserver1.public.users".to_string()),
            group_id: env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "redis-sink".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            stream_key: env::var("STREAM_KEY").ok(),
            startup_timeout: Duration::from_secs(parse_env("STARTUP_TIMEOUT_SECS", 60)?),
            port: parse_env("PORT", 8000)?,
        })
    }

    /// Stream key entries are appended under; identical to the topic unless
    /// overridden.
    pub fn stream_key(&self) -> &str {
        self.stream_key.as_deref().unwrap_or(&self.topic)
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| BridgeError::Config(format!("invalid value for {}: {:?}", name, raw)))
}
