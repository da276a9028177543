use std::env;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{HandlerError, Result};

/// Handler configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Stream store URL
    pub redis_url: String,
    /// Stream to subscribe to; matches the bridge's CDC topic
    pub stream_key: String,
    /// Consumer group name
    pub group_name: String,
    /// Consumer name (instance ID)
    pub consumer_name: String,
    /// XREADGROUP block duration in milliseconds
    pub read_block_ms: u64,
    /// Batch size per read
    pub read_count: usize,
    /// Deadline for the stream store to become reachable at startup
    pub startup_timeout: Duration,
    /// HTTP port for health and metrics
    pub port: u16,
}

impl HandlerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            stream_key: env::var("STREAM_KEY")
                .unwrap_or_else(|_| "dbserver1.public.users".to_string()),
            group_name: env::var("GROUP_NAME").unwrap_or_else(|_| "cdc-handler".to_string()),
            consumer_name: env::var("CONSUMER_NAME")
                .unwrap_or_else(|_| format!("handler-{}", Uuid::new_v4())),
            read_block_ms: parse_env("READ_BLOCK_MS", 5000)?,
            read_count: parse_env("READ_COUNT", 100)?,
            startup_timeout: Duration::from_secs(parse_env("STARTUP_TIMEOUT_SECS", 60)?),
            port: parse_env("PORT", 8001)?,
        })
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
        .map_err(|_| HandlerError::Config(format!("invalid value for {}: {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_numbers() {
        let count: usize = parse_value("READ_COUNT", "250").unwrap();
        assert_eq!(count, 250);
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        let result: Result<u64> = parse_value("READ_BLOCK_MS", "soon");
        assert!(matches!(result, Err(HandlerError::Config(_))));
    }
}
