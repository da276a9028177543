use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::operation::UNKNOWN_OP;
use crate::payload::DebeziumPayload;

/// Field names of a bridged stream entry.
pub const FIELD_OPERATION: &str = "operation";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_DATA: &str = "data";

/// Flat field set the bridge appends to the stream.
///
/// `data` carries the full re-serialized payload; `operation` and
/// `timestamp` are denormalized copies so subscribers can filter without
/// parsing `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEnvelope {
    /// Operation code, or `"unknown"` when the payload has none
    pub operation: String,
    /// Decimal `ts_ms`, or empty when the payload has none
    pub timestamp: String,
    /// The payload as JSON text
    pub data: String,
}

impl BridgeEnvelope {
    /// Build the envelope for one change payload.
    pub fn from_payload(payload: &DebeziumPayload) -> serde_json::Result<Self> {
        Ok(Self {
            operation: payload
                .op
                .clone()
                .unwrap_or_else(|| UNKNOWN_OP.to_string()),
            timestamp: payload.ts_ms.map(|ts| ts.to_string()).unwrap_or_default(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Field/value pairs in append order
    pub fn to_fields(&self) -> [(&'static str, &str); 3] {
        [
            (FIELD_OPERATION, self.operation.as_str()),
            (FIELD_TIMESTAMP, self.timestamp.as_str()),
            (FIELD_DATA, self.data.as_str()),
        ]
    }
}

/// The two shapes a stream entry can take, resolved by whether a `data`
/// field is present. Entries written by the bridge decode as
/// [`StreamShape::Bridged`]; entries some other producer wrote
/// field-by-field decode as [`StreamShape::Raw`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamShape {
    /// Bridge envelope (`data` field present)
    Bridged(BridgeEnvelope),
    /// The entry's fields are the payload itself
    Raw(DebeziumPayload),
}

impl StreamShape {
    /// Classify an entry's field map by shape.
    ///
    /// Raw entries are reassembled by parsing each value as JSON and
    /// falling back to a plain string for bare words such as op codes.
    pub fn from_fields(fields: &HashMap<String, String>) -> serde_json::Result<Self> {
        match fields.get(FIELD_DATA) {
            Some(data) => Ok(Self::Bridged(BridgeEnvelope {
                operation: fields
                    .get(FIELD_OPERATION)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_OP.to_string()),
                timestamp: fields.get(FIELD_TIMESTAMP).cloned().unwrap_or_default(),
                data: data.clone(),
            })),
            None => {
                let mut object = Map::with_capacity(fields.len());
                for (field, value) in fields {
                    let parsed = serde_json::from_str::<Value>(value)
                        .unwrap_or_else(|_| Value::String(value.clone()));
                    object.insert(field.clone(), parsed);
                }
                Ok(Self::Raw(serde_json::from_value(Value::Object(object))?))
            }
        }
    }

    /// Decode to the change payload regardless of shape.
    pub fn into_payload(self) -> serde_json::Result<DebeziumPayload> {
        match self {
            Self::Bridged(envelope) => serde_json::from_str(&envelope.data),
            Self::Raw(payload) => Ok(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> DebeziumPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_from_payload() {
        let payload = payload(json!({
            "after": {"id": 1, "name": "alice"},
            "source": {"table": "users"},
            "op": "c",
            "ts_ms": 1000
        }));

        let envelope = BridgeEnvelope::from_payload(&payload).unwrap();
        assert_eq!(envelope.operation, "c");
        assert_eq!(envelope.timestamp, "1000");

        let recovered: DebeziumPayload = serde_json::from_str(&envelope.data).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn test_envelope_missing_op_and_timestamp() {
        let payload = payload(json!({"after": {"id": 2}}));

        let envelope = BridgeEnvelope::from_payload(&payload).unwrap();
        assert_eq!(envelope.operation, "unknown");
        assert_eq!(envelope.timestamp, "");
    }

    #[test]
    fn test_envelope_field_order() {
        let envelope = BridgeEnvelope {
            operation: "c".to_string(),
            timestamp: "1".to_string(),
            data: "{}".to_string(),
        };
        let fields = envelope.to_fields();
        assert_eq!(fields[0], ("operation", "c"));
        assert_eq!(fields[1], ("timestamp", "1"));
        assert_eq!(fields[2], ("data", "{}"));
    }

    #[test]
    fn test_data_field_selects_bridged_shape() {
        let mut fields = HashMap::new();
        fields.insert("operation".to_string(), "u".to_string());
        fields.insert("timestamp".to_string(), "2000".to_string());
        fields.insert(
            "data".to_string(),
            json!({"op": "u", "before": {"id": 3}, "after": {"id": 3, "n": 2}}).to_string(),
        );

        let shape = StreamShape::from_fields(&fields).unwrap();
        assert!(matches!(shape, StreamShape::Bridged(_)));

        let payload = shape.into_payload().unwrap();
        assert_eq!(payload.op.as_deref(), Some("u"));
        assert_eq!(payload.after, Some(json!({"id": 3, "n": 2})));
    }

    #[test]
    fn test_absent_data_field_selects_raw_shape() {
        let mut fields = HashMap::new();
        fields.insert("op".to_string(), "c".to_string());
        fields.insert("after".to_string(), json!({"id": 9}).to_string());
        fields.insert("ts_ms".to_string(), "3000".to_string());

        let shape = StreamShape::from_fields(&fields).unwrap();
        assert!(matches!(shape, StreamShape::Raw(_)));

        let payload = shape.into_payload().unwrap();
        assert_eq!(payload.op.as_deref(), Some("c"));
        assert_eq!(payload.after, Some(json!({"id": 9})));
        assert_eq!(payload.ts_ms, Some(3000));
    }

    #[test]
    fn test_bridged_with_malformed_data_is_an_error() {
        let mut fields = HashMap::new();
        fields.insert("data".to_string(), "not json".to_string());

        let shape = StreamShape::from_fields(&fields).unwrap();
        assert!(shape.into_payload().is_err());
    }

    #[test]
    fn test_bridged_without_denormalized_fields() {
        let mut fields = HashMap::new();
        fields.insert("data".to_string(), "{}".to_string());

        match StreamShape::from_fields(&fields).unwrap() {
            StreamShape::Bridged(envelope) => {
                assert_eq!(envelope.operation, "unknown");
                assert_eq!(envelope.timestamp, "");
            }
            StreamShape::Raw(_) => panic!("expected bridged shape"),
        }
    }
}
