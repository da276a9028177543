pub mod config;
pub mod error;
pub mod metrics;
pub mod services;

pub use config::HandlerConfig;
pub use error::{HandlerError, Result};
