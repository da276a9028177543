use actix_web::HttpResponse;
use prometheus::{Encoder, IntCounter, IntGauge, TextEncoder};

/// Metrics for bridge monitoring
#[derive(Clone)]
pub struct BridgeMetrics {
    /// Total records forwarded to the stream
    pub records_forwarded_total: IntCounter,
    /// Total tombstone records skipped
    pub tombstones_skipped_total: IntCounter,
    /// Total records that failed to decode
    pub decode_errors_total: IntCounter,
    /// Total envelopes that failed to append
    pub append_errors_total: IntCounter,
    /// Total Kafka consumer errors
    pub consumer_errors_total: IntCounter,
    /// Consumer health status (1 = healthy, 0 = unhealthy)
    pub consumer_healthy: IntGauge,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        let registry = prometheus::default_registry();

        let records_forwarded_total = IntCounter::new(
            "cdc_bridge_records_forwarded_total",
            "Total number of change records forwarded to the stream",
        )
        .expect("valid metric for cdc_bridge_records_forwarded_total");

        let tombstones_skipped_total = IntCounter::new(
            "cdc_bridge_tombstones_skipped_total",
            "Total number of tombstone records skipped",
        )
        .expect("valid metric for cdc_bridge_tombstones_skipped_total");

        let decode_errors_total = IntCounter::new(
            "cdc_bridge_decode_errors_total",
            "Total number of records that failed to decode",
        )
        .expect("valid metric for cdc_bridge_decode_errors_total");

        let append_errors_total = IntCounter::new(
            "cdc_bridge_append_errors_total",
            "Total number of envelopes that failed to append to the stream",
        )
        .expect("valid metric for cdc_bridge_append_errors_total");

        let consumer_errors_total = IntCounter::new(
            "cdc_bridge_consumer_errors_total",
            "Total number of Kafka consumer errors encountered",
        )
        .expect("valid metric for cdc_bridge_consumer_errors_total");

        let consumer_healthy = IntGauge::new(
            "cdc_bridge_consumer_healthy",
            "Bridge consumer health status (1 = healthy, 0 = unhealthy)",
        )
        .expect("valid metric for cdc_bridge_consumer_healthy");

        // Register all metrics
        for metric in [
            Box::new(records_forwarded_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(tombstones_skipped_total.clone()),
            Box::new(decode_errors_total.clone()),
            Box::new(append_errors_total.clone()),
            Box::new(consumer_errors_total.clone()),
            Box::new(consumer_healthy.clone()),
        ] {
            let _ = registry.register(metric);
        }

        // Start as healthy
        consumer_healthy.set(1);

        Self {
            records_forwarded_total,
            tombstones_skipped_total,
            decode_errors_total,
            append_errors_total,
            consumer_errors_total,
            consumer_healthy,
        }
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
