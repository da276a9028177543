use thiserror::Error;

pub type Result<T> = std::result::Result<T, HandlerError>;

/// Handler error taxonomy.
///
/// `Config` and `Connection` are fatal at startup; `Redis` and `Decode` are
/// recoverable per entry (logged, counted, the loop continues).
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Decode error: {0}")]
    Decode(String),
}
