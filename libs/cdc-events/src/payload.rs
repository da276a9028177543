use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// CDC message structure from Debezium.
///
/// When `value.converter.schemas.enable = true`, Debezium wraps the payload
/// in a `{schema, payload}` object; when disabled it sends the payload
/// directly. The wrapped variant is listed first so that an object carrying
/// a `payload` key is unwrapped and anything else is taken as the payload
/// itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeEvent {
    /// Format with schema wrapper (value.converter.schemas.enable = true)
    Wrapped { payload: DebeziumPayload },
    /// Format without schema wrapper (value.converter.schemas.enable = false)
    Bare(DebeziumPayload),
}

impl ChangeEvent {
    /// Get the payload regardless of message format
    pub fn payload(&self) -> &DebeziumPayload {
        match self {
            ChangeEvent::Wrapped { payload } => payload,
            ChangeEvent::Bare(payload) => payload,
        }
    }

    /// Consume the event, yielding the payload
    pub fn into_payload(self) -> DebeziumPayload {
        match self {
            ChangeEvent::Wrapped { payload } => payload,
            ChangeEvent::Bare(payload) => payload,
        }
    }
}

/// The Debezium change payload.
///
/// Every field is optional on the wire: connectors differ, and a payload
/// that omits `op` or `source` must still relay. Fields this model does not
/// name are captured in `extra` so re-serialization loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebeziumPayload {
    /// State before the change (populated for update/delete)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    /// State after the change (populated for create/update/read)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,

    /// Source metadata (table name, connector details)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,

    /// Operation code (c/u/d/r); unrecognized codes pass through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    /// Transaction timestamp in milliseconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_ms: Option<i64>,

    /// Unmodeled fields (ts_us, transaction, ...) kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DebeziumPayload {
    /// Table name from the source block, if the payload carries one
    pub fn table(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.table.as_deref())
    }
}

/// Source metadata attached to each change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Table the change originated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Connector fields not modeled here (db, schema, lsn, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_wrapped_message() {
        let raw = json!({
            "schema": {"type": "struct"},
            "payload": {
                "before": null,
                "after": {"id": 1, "name": "alice"},
                "source": {"table": "users", "db": "inventory"},
                "op": "c",
                "ts_ms": 1_700_000_000_000u64
            }
        });

        let event: ChangeEvent = serde_json::from_value(raw).unwrap();
        let payload = event.payload();
        assert_eq!(payload.op.as_deref(), Some("c"));
        assert_eq!(payload.table(), Some("users"));
        assert_eq!(payload.after, Some(json!({"id": 1, "name": "alice"})));
    }

    #[test]
    fn test_decode_bare_message() {
        let raw = json!({
            "before": {"id": 2},
            "after": {"id": 2, "name": "bob"},
            "source": {"table": "users"},
            "op": "u",
            "ts_ms": 1_700_000_000_001u64
        });

        let event: ChangeEvent = serde_json::from_value(raw).unwrap();
        assert!(matches!(event, ChangeEvent::Bare(_)));
        let payload = event.into_payload();
        assert_eq!(payload.op.as_deref(), Some("u"));
        assert!(payload.before.is_some());
        assert!(payload.after.is_some());
    }

    #[test]
    fn test_missing_fields_tolerated() {
        let payload: DebeziumPayload = serde_json::from_value(json!({
            "op": "d",
            "before": {"id": 3}
        }))
        .unwrap();

        assert_eq!(payload.op.as_deref(), Some("d"));
        assert!(payload.after.is_none());
        assert!(payload.source.is_none());
        assert!(payload.ts_ms.is_none());
        assert_eq!(payload.table(), None);
    }

    #[test]
    fn test_unmodeled_fields_survive_reserialization() {
        let raw = json!({
            "after": {"id": 4},
            "source": {"table": "users", "lsn": 987654, "snapshot": "false"},
            "op": "r",
            "ts_ms": 5000,
            "ts_us": 5_000_123,
            "transaction": {"id": "tx-1"}
        });

        let payload: DebeziumPayload = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(payload.extra.get("ts_us"), Some(&json!(5_000_123)));

        let reserialized = serde_json::to_value(&payload).unwrap();
        assert_eq!(reserialized, raw);
    }

    #[test]
    fn test_payload_roundtrip_equality() {
        let original: DebeziumPayload = serde_json::from_value(json!({
            "before": {"id": 5, "name": "carol"},
            "after": {"id": 5, "name": "carole"},
            "source": {"table": "users", "db": "inventory", "schema": "public"},
            "op": "u",
            "ts_ms": 42
        }))
        .unwrap();

        let text = serde_json::to_string(&original).unwrap();
        let decoded: DebeziumPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, original);
    }
}
