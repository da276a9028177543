use cdc_events::{CdcOperation, DebeziumPayload};
use serde_json::Value;
use tracing::info;

/// A change event prepared for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEvent {
    pub kind: CdcOperation,
    pub table: Option<String>,
    pub ts_ms: Option<i64>,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Select what to present for one change payload.
///
/// Create and read show the new row, update shows both rows, delete shows
/// the old row, unknown kinds show metadata only. Table and timestamp are
/// always carried, whether present in the payload or not.
pub fn render_event(payload: &DebeziumPayload) -> RenderedEvent {
    let kind = CdcOperation::classify(payload.op.as_deref());

    let (before, after) = match kind {
        CdcOperation::Create | CdcOperation::Read => (None, payload.after.clone()),
        CdcOperation::Update => (payload.before.clone(), payload.after.clone()),
        CdcOperation::Delete => (payload.before.clone(), None),
        CdcOperation::Unknown(_) => (None, None),
    };

    RenderedEvent {
        kind,
        table: payload.table().map(|t| t.to_string()),
        ts_ms: payload.ts_ms,
        before,
        after,
    }
}

impl RenderedEvent {
    /// Emit the event through the structured log output.
    pub fn emit(&self) {
        info!(
            operation = %self.kind,
            table = self.table.as_deref().unwrap_or("unknown"),
            ts_ms = %self.ts_ms.map(|ts| ts.to_string()).unwrap_or_default(),
            "Change event received"
        );
        if let Some(before) = &self.before {
            info!(row = %before, "Before image");
        }
        if let Some(after) = &self.after {
            info!(row = %after, "After image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> DebeziumPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_shows_after_only() {
        let rendered = render_event(&payload(json!({
            "op": "c",
            "after": {"id": 1, "name": "alice"},
            "source": {"table": "users"},
            "ts_ms": 1000
        })));

        assert_eq!(rendered.kind, CdcOperation::Create);
        assert_eq!(rendered.table.as_deref(), Some("users"));
        assert_eq!(rendered.ts_ms, Some(1000));
        assert!(rendered.before.is_none());
        assert_eq!(rendered.after, Some(json!({"id": 1, "name": "alice"})));
    }

    #[test]
    fn test_read_shows_after_only() {
        let rendered = render_event(&payload(json!({
            "op": "r",
            "after": {"id": 2},
            "source": {"table": "users"},
            "ts_ms": 2000
        })));

        assert_eq!(rendered.kind, CdcOperation::Read);
        assert!(rendered.before.is_none());
        assert!(rendered.after.is_some());
    }

    #[test]
    fn test_update_shows_both_rows() {
        let rendered = render_event(&payload(json!({
            "op": "u",
            "before": {"id": 3, "name": "bob"},
            "after": {"id": 3, "name": "bobby"},
            "source": {"table": "users"},
            "ts_ms": 3000
        })));

        assert_eq!(rendered.kind, CdcOperation::Update);
        assert_eq!(rendered.before, Some(json!({"id": 3, "name": "bob"})));
        assert_eq!(rendered.after, Some(json!({"id": 3, "name": "bobby"})));
    }

    #[test]
    fn test_delete_shows_before_only() {
        let rendered = render_event(&payload(json!({
            "op": "d",
            "before": {"id": 4},
            "source": {"table": "users"},
            "ts_ms": 4000
        })));

        assert_eq!(rendered.kind, CdcOperation::Delete);
        assert_eq!(rendered.before, Some(json!({"id": 4})));
        assert!(rendered.after.is_none());
    }

    #[test]
    fn test_unknown_kind_shows_metadata_only() {
        let rendered = render_event(&payload(json!({
            "op": "t",
            "before": {"id": 5},
            "after": {"id": 5},
            "source": {"table": "users"},
            "ts_ms": 5000
        })));

        assert_eq!(rendered.kind, CdcOperation::Unknown("t".to_string()));
        assert!(rendered.before.is_none());
        assert!(rendered.after.is_none());
        assert_eq!(rendered.table.as_deref(), Some("users"));
        assert_eq!(rendered.ts_ms, Some(5000));
    }

    #[test]
    fn test_missing_metadata_tolerated() {
        let rendered = render_event(&payload(json!({
            "op": "c",
            "after": {"id": 6}
        })));

        assert_eq!(rendered.kind, CdcOperation::Create);
        assert!(rendered.table.is_none());
        assert!(rendered.ts_ms.is_none());
        assert_eq!(rendered.after, Some(json!({"id": 6})));
    }
}
