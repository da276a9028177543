use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use bridge_service::config::BridgeConfig;
use bridge_service::metrics::{self, BridgeMetrics};
use bridge_service::services::{
    create_consumer, wait_for_dependencies, CdcBridge, RedisStreamSink,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rdkafka=warn,bridge_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting bridge-service");

    let config = BridgeConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        "Bridge config: brokers={}, topic={}, group_id={}, stream_key={}",
        config.bootstrap_servers,
        config.topic,
        config.group_id,
        config.stream_key()
    );

    // Both dependencies must answer before the loop starts; still unreachable
    // at the deadline exits non-zero.
    wait_for_dependencies(&config)
        .await
        .context("Dependencies unreachable at startup")?;

    let sink = RedisStreamSink::connect(&config.redis_url)
        .await
        .context("Failed to connect Redis sink")?;
    let consumer = create_consumer(&config).context("Failed to create Kafka consumer")?;

    let bridge = CdcBridge::new(sink, config.stream_key(), BridgeMetrics::new());
    tokio::spawn(async move {
        tracing::info!("Bridge task started");
        if let Err(e) = bridge.run(consumer).await {
            tracing::error!("Bridge loop failed: {:?}", e);
        }
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(|| async { "ready" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .bind(&addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")
}
