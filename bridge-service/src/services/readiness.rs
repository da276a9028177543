use std::future::Future;
use std::time::{Duration, Instant};

use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

const MIN_PROBE_BACKOFF_SECS: u64 = 1;
const MAX_PROBE_BACKOFF_SECS: u64 = 10;
const PROBE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for Kafka and Redis to become reachable, retrying with exponential
/// backoff until the configured deadline.
///
/// There is no fixed startup sleep: the bridge proceeds the moment both
/// probes pass, and a dependency still unreachable at the deadline is fatal.
pub async fn wait_for_dependencies(config: &BridgeConfig) -> Result<()> {
    let deadline = Instant::now() + config.startup_timeout;

    probe_until(deadline, "Kafka", || probe_kafka(&config.bootstrap_servers)).await?;
    probe_until(deadline, "Redis", || probe_redis(&config.redis_url)).await?;

    Ok(())
}

async fn probe_until<F, Fut>(deadline: Instant, dependency: &str, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<(), String>>,
{
    let mut attempt: u32 = 0;
    loop {
        match probe().await {
            Ok(()) => {
                info!("{} is reachable", dependency);
                return Ok(());
            }
            Err(reason) => {
                attempt += 1;
                let now = Instant::now();
                if now >= deadline {
                    return Err(BridgeError::Connection(format!(
                        "{} unreachable at startup deadline: {}",
                        dependency, reason
                    )));
                }
                let backoff = probe_backoff(attempt).min(deadline - now);
                warn!(
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    "{} not ready, retrying: {}",
                    dependency,
                    reason
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Exponential backoff: 2^(attempt-1) seconds, capped
fn probe_backoff(attempt: u32) -> Duration {
    let secs = 2u64
        .saturating_pow(attempt.saturating_sub(1))
        .clamp(MIN_PROBE_BACKOFF_SECS, MAX_PROBE_BACKOFF_SECS);
    Duration::from_secs(secs)
}

/// Fetch cluster metadata in a blocking context; ready when at least one
/// broker reports in.
async fn probe_kafka(brokers: &str) -> std::result::Result<(), String> {
    let brokers = brokers.to_string();
    tokio::task::spawn_blocking(move || {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("request.timeout.ms", "5000")
            .create()
            .map_err(|e| format!("failed to create Kafka admin client: {}", e))?;

        let metadata = admin
            .inner()
            .fetch_metadata(None, PROBE_ATTEMPT_TIMEOUT)
            .map_err(|e| format!("failed to fetch Kafka metadata: {}", e))?;

        if metadata.brokers().is_empty() {
            return Err("no Kafka brokers available".to_string());
        }

        Ok(())
    })
    .await
    .map_err(|e| format!("failed to join probe task: {}", e))?
}

async fn probe_redis(redis_url: &str) -> std::result::Result<(), String> {
    let client =
        redis::Client::open(redis_url).map_err(|e| format!("invalid Redis URL: {}", e))?;

    let mut conn = tokio::time::timeout(
        PROBE_ATTEMPT_TIMEOUT,
        client.get_multiplexed_async_connection(),
    )
    .await
    .map_err(|_| "timed out connecting to Redis".to_string())?
    .map_err(|e| format!("failed to connect to Redis: {}", e))?;

    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .map_err(|e| format!("failed to ping Redis: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_backoff_grows_and_caps() {
        assert_eq!(probe_backoff(1), Duration::from_secs(1));
        assert_eq!(probe_backoff(2), Duration::from_secs(2));
        assert_eq!(probe_backoff(3), Duration::from_secs(4));
        assert_eq!(probe_backoff(4), Duration::from_secs(8));
        assert_eq!(probe_backoff(5), Duration::from_secs(10));
        assert_eq!(probe_backoff(30), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_probe_until_fails_at_deadline() {
        let deadline = Instant::now();
        let result = probe_until(deadline, "test", || async {
            Err("always down".to_string())
        })
        .await;

        match result {
            Err(BridgeError::Connection(reason)) => {
                assert!(reason.contains("test unreachable"));
                assert!(reason.contains("always down"));
            }
            other => panic!("expected connection error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_until_returns_on_first_success() {
        let deadline = Instant::now() + Duration::from_secs(60);
        let started = Instant::now();
        probe_until(deadline, "test", || async { Ok(()) })
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
