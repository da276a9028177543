use async_trait::async_trait;
use cdc_events::BridgeEnvelope;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::error;

use crate::error::{BridgeError, Result};

/// Append target for bridged envelopes.
///
/// Production appends to a Redis Stream; tests substitute an in-memory
/// recorder.
#[async_trait]
pub trait StreamSink: Send {
    /// Append one envelope under the given stream key, returning the
    /// assigned entry id.
    async fn append(&mut self, stream_key: &str, envelope: &BridgeEnvelope) -> Result<String>;
}

/// Redis Streams sink. The connection manager reconnects on its own, so a
/// broker bounce surfaces as per-append errors rather than a dead sink.
pub struct RedisStreamSink {
    conn: ConnectionManager,
}

impl RedisStreamSink {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            error!("Invalid Redis URL: {}", e);
            BridgeError::Connection(format!("invalid Redis URL: {}", e))
        })?;

        let conn = client.get_connection_manager().await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            BridgeError::Connection(format!("Redis connection failed: {}", e))
        })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl StreamSink for RedisStreamSink {
    async fn append(&mut self, stream_key: &str, envelope: &BridgeEnvelope) -> Result<String> {
        let fields = envelope.to_fields();
        let entry_id: String = self.conn.xadd(stream_key, "*", &fields).await?;
        Ok(entry_id)
    }
}
