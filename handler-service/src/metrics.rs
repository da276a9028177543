use actix_web::HttpResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

/// Metrics for handler monitoring
#[derive(Clone)]
pub struct HandlerMetrics {
    /// Rendered events by operation label
    pub events_total: IntCounterVec,
    /// Total entries that failed to decode
    pub decode_errors_total: IntCounter,
    /// Total stream read errors
    pub read_errors_total: IntCounter,
}

impl HandlerMetrics {
    pub fn new() -> Self {
        let registry = prometheus::default_registry();

        let events_total = IntCounterVec::new(
            Opts::new(
                "cdc_handler_events_total",
                "Total number of change events rendered, by operation",
            ),
            &["operation"],
        )
        .expect("valid metric for cdc_handler_events_total");

        let decode_errors_total = IntCounter::new(
            "cdc_handler_decode_errors_total",
            "Total number of stream entries that failed to decode",
        )
        .expect("valid metric for cdc_handler_decode_errors_total");

        let read_errors_total = IntCounter::new(
            "cdc_handler_read_errors_total",
            "Total number of stream read errors",
        )
        .expect("valid metric for cdc_handler_read_errors_total");

        // Register all metrics
        for metric in [
            Box::new(events_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(decode_errors_total.clone()),
            Box::new(read_errors_total.clone()),
        ] {
            let _ = registry.register(metric);
        }

        Self {
            events_total,
            decode_errors_total,
            read_errors_total,
        }
    }
}

impl Default for HandlerMetrics {
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
