use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use cdc_events::{BridgeEnvelope, ChangeEvent};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::metrics::BridgeMetrics;
use crate::services::sink::StreamSink;

/// Threshold for consecutive receive errors before marking the bridge unhealthy
const UNHEALTHY_ERROR_THRESHOLD: u32 = 5;

/// Threshold for consecutive receive errors before emitting a critical alert
const CRITICAL_ERROR_THRESHOLD: u32 = 10;

/// Outcome of processing one Kafka record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Envelope appended to the stream under the given entry id
    Forwarded { operation: String, entry_id: String },
    /// Tombstone record, nothing to append
    SkippedTombstone,
}

/// Error handling state for the consume loop
struct ConsumerErrorState {
    /// Number of consecutive receive errors
    consecutive_count: AtomicU32,
    /// Timestamp of last successful receive (Unix millis)
    last_success_ms: AtomicU64,
}

impl ConsumerErrorState {
    fn new() -> Self {
        Self {
            consecutive_count: AtomicU32::new(0),
            last_success_ms: AtomicU64::new(now_millis()),
        }
    }

    /// Record a successful receive, resetting the error count
    fn record_success(&self) {
        self.consecutive_count.store(0, Ordering::SeqCst);
        self.last_success_ms.store(now_millis(), Ordering::SeqCst);
    }

    /// Record an error, incrementing the consecutive count
    fn record_error(&self) -> u32 {
        self.consecutive_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn time_since_success(&self) -> Duration {
        let last = self.last_success_ms.load(Ordering::SeqCst);
        Duration::from_millis(now_millis().saturating_sub(last))
    }

    /// Backoff duration for the current error streak (exponential with cap)
    fn calculate_backoff(&self) -> Duration {
        const MAX_BACKOFF_SECS: u64 = 60;

        let errors = self.consecutive_count.load(Ordering::SeqCst);
        let backoff_secs = 2u64
            .saturating_pow(errors.saturating_sub(1))
            .min(MAX_BACKOFF_SECS);
        Duration::from_secs(backoff_secs)
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Create the Kafka consumer and subscribe to the CDC topic.
pub fn create_consumer(config: &BridgeConfig) -> Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("group.id", &config.group_id)
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("enable.auto.commit", "true")
        .set("auto.commit.interval.ms", "5000")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", "30000")
        .set("heartbeat.interval.ms", "3000")
        .set("max.poll.interval.ms", "300000")
        .set("enable.partition.eof", "false")
        .create()
        .map_err(|e| {
            error!("Failed to create Kafka consumer: {}", e);
            BridgeError::Kafka(e.to_string())
        })?;

    consumer.subscribe(&[config.topic.as_str()]).map_err(|e| {
        error!("Failed to subscribe to topic {}: {}", config.topic, e);
        BridgeError::Kafka(e.to_string())
    })?;

    info!("Kafka consumer subscribed to topic: {}", config.topic);
    Ok(consumer)
}

/// Kafka to Redis Stream bridge.
///
/// Reshapes each Debezium change record into a flat envelope and appends it
/// to the stream whose key matches the topic. Business data passes through
/// untouched; the bridge neither validates nor filters.
pub struct CdcBridge<S> {
    sink: S,
    stream_key: String,
    metrics: BridgeMetrics,
    error_state: ConsumerErrorState,
}

impl<S: StreamSink> CdcBridge<S> {
    pub fn new(sink: S, stream_key: impl Into<String>, metrics: BridgeMetrics) -> Self {
        Self {
            sink,
            stream_key: stream_key.into(),
            metrics,
            error_state: ConsumerErrorState::new(),
        }
    }

    /// Run the bridge loop.
    ///
    /// Per-record failures are logged and skipped; receive errors back off
    /// exponentially (1s -> 2s -> ... -> 60s max). The loop itself never
    /// terminates the process.
    pub async fn run(mut self, consumer: StreamConsumer) -> Result<()> {
        info!("Starting bridge loop: stream_key={}", self.stream_key);

        loop {
            match consumer.recv().await {
                Ok(msg) => {
                    self.error_state.record_success();
                    self.metrics.consumer_healthy.set(1);

                    let topic = msg.topic().to_string();
                    let partition = msg.partition();
                    let offset = msg.offset();

                    debug!(
                        "Received record: topic={}, partition={}, offset={}",
                        topic, partition, offset
                    );

                    match self.process_record(msg.payload()).await {
                        Ok(RecordOutcome::Forwarded {
                            operation,
                            entry_id,
                        }) => {
                            info!(
                                operation = %operation,
                                stream = %self.stream_key,
                                entry_id = %entry_id,
                                "Forwarded change event"
                            );
                        }
                        Ok(RecordOutcome::SkippedTombstone) => {
                            debug!(
                                "Skipped tombstone record: topic={}, partition={}, offset={}",
                                topic, partition, offset
                            );
                        }
                        Err(e) => {
                            // Auto-commit advances past the record either way;
                            // the failure stays visible in logs and metrics
                            error!(
                                "Failed to relay record (topic={}, partition={}, offset={}): {}",
                                topic, partition, offset, e
                            );
                        }
                    }
                }
                Err(e) => {
                    let consecutive = self.error_state.record_error();
                    self.metrics.consumer_errors_total.inc();

                    let backoff = self.error_state.calculate_backoff();
                    if consecutive >= UNHEALTHY_ERROR_THRESHOLD {
                        self.metrics.consumer_healthy.set(0);
                    }

                    if consecutive >= CRITICAL_ERROR_THRESHOLD {
                        error!(
                            consecutive_errors = consecutive,
                            backoff_secs = backoff.as_secs(),
                            time_since_success_secs =
                                self.error_state.time_since_success().as_secs(),
                            "Kafka receive failing persistently, manual intervention \
                             may be required: {}",
                            e
                        );
                    } else if consecutive >= UNHEALTHY_ERROR_THRESHOLD {
                        warn!(
                            consecutive_errors = consecutive,
                            backoff_secs = backoff.as_secs(),
                            "Kafka receive unhealthy after repeated errors: {}",
                            e
                        );
                    } else {
                        error!(
                            consecutive_errors = consecutive,
                            backoff_secs = backoff.as_secs(),
                            "Kafka receive error, retrying with backoff: {}",
                            e
                        );
                    }

                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Process one record: skip tombstones, decode, build the envelope,
    /// append it to the stream.
    pub async fn process_record(&mut self, raw: Option<&[u8]>) -> Result<RecordOutcome> {
        let raw = match raw {
            Some(raw) => raw,
            None => {
                self.metrics.tombstones_skipped_total.inc();
                return Ok(RecordOutcome::SkippedTombstone);
            }
        };

        let payload = match serde_json::from_slice::<ChangeEvent>(raw) {
            Ok(event) => event.into_payload(),
            Err(e) => {
                self.metrics.decode_errors_total.inc();
                return Err(BridgeError::Decode(format!(
                    "invalid change record ({}): {}",
                    e,
                    String::from_utf8_lossy(raw)
                )));
            }
        };

        let envelope = BridgeEnvelope::from_payload(&payload)
            .map_err(|e| BridgeError::Decode(format!("envelope serialization failed: {}", e)))?;

        match self.sink.append(&self.stream_key, &envelope).await {
            Ok(entry_id) => {
                self.metrics.records_forwarded_total.inc();
                Ok(RecordOutcome::Forwarded {
                    operation: envelope.operation,
                    entry_id,
                })
            }
            Err(e) => {
                self.metrics.append_errors_total.inc();
                Err(e)
            }
        }
    }
}
