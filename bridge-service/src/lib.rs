pub mod config;
pub mod error;
pub mod metrics;
pub mod services;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
