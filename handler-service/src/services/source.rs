use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result};

const MIN_PROBE_BACKOFF_SECS: u64 = 1;
const MAX_PROBE_BACKOFF_SECS: u64 = 10;
const PROBE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// One delivered stream entry: the store-assigned id and its field map.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub id: String,
    pub fields: HashMap<String, redis::Value>,
}

/// Delivery surface for the subscribe loop.
///
/// Production reads a Redis Stream through a consumer group; tests
/// substitute an in-memory feed that records acknowledgements.
#[async_trait]
pub trait StreamSource: Send {
    /// Block for the next batch of undelivered entries. An empty batch is
    /// a read timeout, not an error.
    async fn read_batch(&mut self) -> Result<Vec<StreamEntry>>;

    /// Acknowledge one processed entry.
    async fn ack(&mut self, entry_id: &str) -> Result<()>;
}

/// Redis Streams consumer-group source.
pub struct RedisStreamSource {
    conn: ConnectionManager,
    stream_key: String,
    group_name: String,
    options: StreamReadOptions,
}

impl RedisStreamSource {
    /// Connect to the stream store and create the consumer group, retrying
    /// the connection with exponential backoff until the startup deadline.
    /// Still unreachable at the deadline is fatal.
    pub async fn connect(config: HandlerConfig) -> Result<Self> {
        let deadline = Instant::now() + config.startup_timeout;
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| HandlerError::Connection(format!("invalid Redis URL: {}", e)))?;

        let mut attempt: u32 = 0;
        let conn = loop {
            let reason = match tokio::time::timeout(
                PROBE_ATTEMPT_TIMEOUT,
                client.get_connection_manager(),
            )
            .await
            {
                Ok(Ok(mut conn)) => {
                    match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
                        Ok(_) => break conn,
                        Err(e) => format!("failed to ping Redis: {}", e),
                    }
                }
                Ok(Err(e)) => format!("Redis connection failed: {}", e),
                Err(_) => "timed out connecting to Redis".to_string(),
            };

            attempt += 1;
            let now = Instant::now();
            if now >= deadline {
                return Err(HandlerError::Connection(format!(
                    "Redis unreachable at startup deadline: {}",
                    reason
                )));
            }
            let backoff = probe_backoff(attempt).min(deadline - now);
            warn!(
                attempt,
                backoff_secs = backoff.as_secs(),
                "Redis not ready, retrying: {}",
                reason
            );
            tokio::time::sleep(backoff).await;
        };

        info!("Connected to stream store");
        let options = StreamReadOptions::default()
            .group(&config.group_name, &config.consumer_name)
            .block(config.read_block_ms as usize)
            .count(config.read_count);

        let mut source = Self {
            conn,
            stream_key: config.stream_key.clone(),
            group_name: config.group_name.clone(),
            options,
        };
        source.ensure_group().await?;
        info!(
            "Subscribed to stream {} as {}/{}",
            source.stream_key, source.group_name, config.consumer_name
        );
        Ok(source)
    }

    /// Create the consumer group from the start of the stream, creating the
    /// stream if it does not exist yet. A group that already exists is fine.
    async fn ensure_group(&mut self) -> Result<()> {
        let result: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(&self.group_name)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut self.conn)
            .await;

        match result {
            Ok(()) => {
                info!(
                    "Created consumer group {} on stream {}",
                    self.group_name, self.stream_key
                );
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {
                debug!("Consumer group {} already exists", self.group_name);
                Ok(())
            }
            Err(e) => Err(HandlerError::Redis(e)),
        }
    }
}

#[async_trait]
impl StreamSource for RedisStreamSource {
    async fn read_batch(&mut self) -> Result<Vec<StreamEntry>> {
        let reply: StreamReadReply = self
            .conn
            .xread_options(&[self.stream_key.as_str()], &[">"], &self.options)
            .await?;

        let mut entries = Vec::new();
        for key in reply.keys {
            for entry in key.ids {
                entries.push(StreamEntry {
                    id: entry.id,
                    fields: entry.map,
                });
            }
        }
        Ok(entries)
    }

    async fn ack(&mut self, entry_id: &str) -> Result<()> {
        let acked: redis::RedisResult<()> = self
            .conn
            .xack(&self.stream_key, &self.group_name, &[entry_id])
            .await;
        Ok(acked?)
    }
}

/// Exponential backoff: 2^(attempt-1) seconds, capped
fn probe_backoff(attempt: u32) -> Duration {
    let secs = 2u64
        .saturating_pow(attempt.saturating_sub(1))
        .clamp(MIN_PROBE_BACKOFF_SECS, MAX_PROBE_BACKOFF_SECS);
    Duration::from_secs(secs)
}
