use std::collections::HashMap;
use std::time::Duration;

use cdc_events::{DebeziumPayload, StreamShape};
use tracing::{error, info, warn};

use crate::error::{HandlerError, Result};
use crate::metrics::HandlerMetrics;
use crate::services::render::render_event;
use crate::services::source::{StreamEntry, StreamSource};

/// Convert a raw stream entry field map into a change payload.
///
/// Entries may be bridge envelopes (a `data` field holding the payload as
/// JSON) or flat field-per-column entries written by some other producer;
/// both shapes decode to the same [`DebeziumPayload`].
pub fn decode_entry(map: &HashMap<String, redis::Value>) -> Result<DebeziumPayload> {
    let mut fields = HashMap::with_capacity(map.len());
    for (name, value) in map {
        let text: String = redis::from_redis_value(value).map_err(|e| {
            HandlerError::Decode(format!("field {} is not a UTF-8 string: {}", name, e))
        })?;
        fields.insert(name.clone(), text);
    }

    let shape = StreamShape::from_fields(&fields)
        .map_err(|e| HandlerError::Decode(format!("unreadable entry: {}", e)))?;
    shape
        .into_payload()
        .map_err(|e| HandlerError::Decode(format!("unreadable payload: {}", e)))
}

/// Consumer-group subscriber that renders change events from the stream.
pub struct StreamSubscriber<S> {
    source: S,
    metrics: HandlerMetrics,
}

impl<S: StreamSource> StreamSubscriber<S> {
    pub fn new(source: S, metrics: HandlerMetrics) -> Self {
        Self { source, metrics }
    }

    /// Run the subscribe loop until the task is aborted. Read errors are
    /// logged and retried after a short pause; they never end the loop.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting subscribe loop");

        loop {
            let entries = match self.source.read_batch().await {
                Ok(entries) => entries,
                Err(e) => {
                    self.metrics.read_errors_total.inc();
                    error!("Stream read error (will retry): {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            for entry in entries {
                self.handle_entry(&entry).await;
            }
        }
    }

    /// Decode, render, and acknowledge one entry.
    pub async fn handle_entry(&mut self, entry: &StreamEntry) {
        match decode_entry(&entry.fields) {
            Ok(payload) => {
                let rendered = render_event(&payload);
                self.metrics
                    .events_total
                    .with_label_values(&[rendered.kind.label()])
                    .inc();
                rendered.emit();
            }
            Err(e) => {
                self.metrics.decode_errors_total.inc();
                error!(
                    "Failed to decode stream entry {}: {} (fields: {:?})",
                    entry.id, e, entry.fields
                );
            }
        }

        // Ack either way; a poison entry must not stay pending forever
        if let Err(e) = self.source.ack(&entry.id).await {
            warn!("Failed to ack entry {}: {}", entry.id, e);
        }
    }
}
