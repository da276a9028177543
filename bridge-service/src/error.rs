use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error taxonomy.
///
/// `Config` and `Connection` are fatal at startup; the rest are recoverable
/// per record (logged, counted, the loop continues).
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Kafka error: {0}")]
    Kafka(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Decode error: {0}")]
    Decode(String),
}
