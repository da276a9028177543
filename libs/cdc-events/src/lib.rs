//! Shared CDC data model for the relay services.
//!
//! Covers the three wire shapes the relay deals with:
//! - [`ChangeEvent`]: a Debezium record as read from Kafka, with or without
//!   the schema wrapper.
//! - [`BridgeEnvelope`]: the flat field set the bridge appends to the stream.
//! - [`StreamShape`]: a stream entry read back by a subscriber, which is
//!   either a bridge envelope or a payload written field-by-field.

pub mod envelope;
pub mod operation;
pub mod payload;

pub use envelope::{BridgeEnvelope, StreamShape, FIELD_DATA, FIELD_OPERATION, FIELD_TIMESTAMP};
pub use operation::{CdcOperation, UNKNOWN_OP};
pub use payload::{ChangeEvent, DebeziumPayload, SourceInfo};
