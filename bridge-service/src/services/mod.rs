pub mod bridge;
pub mod readiness;
pub mod sink;

pub use bridge::{create_consumer, CdcBridge, RecordOutcome};
pub use readiness::wait_for_dependencies;
pub use sink::{RedisStreamSink, StreamSink};
