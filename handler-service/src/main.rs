use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handler_service::metrics::{self, HandlerMetrics};
use handler_service::services::{RedisStreamSource, StreamSubscriber};
use handler_service::HandlerConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,handler_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HandlerConfig::from_env().context("Failed to load configuration")?;
    info!(
        "Starting handler service: stream={} group={} consumer={}",
        config.stream_key, config.group_name, config.consumer_name
    );

    let port = config.port;
    let source = RedisStreamSource::connect(config)
        .await
        .context("Failed to start stream subscriber")?;
    let subscriber = StreamSubscriber::new(source, HandlerMetrics::new());

    tokio::spawn(async move {
        if let Err(e) = subscriber.run().await {
            error!("Subscriber terminated: {}", e);
        }
    });

    info!("Handler service listening on port {}", port);
    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(|| async { "ready" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}
