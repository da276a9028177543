use std::fmt;

/// Operation code reported when a payload carries no `op` field.
pub const UNKNOWN_OP: &str = "unknown";

/// CDC operation kinds from Debezium's `op` field.
///
/// The domain is closed: codes outside `c`/`u`/`d`/`r` are carried in
/// [`CdcOperation::Unknown`] verbatim rather than dropped, so a newer
/// connector never breaks the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdcOperation {
    /// Insert operation (c = create)
    Create,
    /// Update operation (u = update)
    Update,
    /// Delete operation (d = delete)
    Delete,
    /// Read operation (r = read, initial snapshot)
    Read,
    /// Any other code, kept verbatim
    Unknown(String),
}

impl CdcOperation {
    /// Classify an operation code. A missing code maps to
    /// `Unknown("unknown")`.
    pub fn classify(op: Option<&str>) -> Self {
        match op {
            Some("c") => Self::Create,
            Some("u") => Self::Update,
            Some("d") => Self::Delete,
            Some("r") => Self::Read,
            Some(other) => Self::Unknown(other.to_string()),
            None => Self::Unknown(UNKNOWN_OP.to_string()),
        }
    }

    /// The wire code this kind classifies from
    pub fn code(&self) -> &str {
        match self {
            Self::Create => "c",
            Self::Update => "u",
            Self::Delete => "d",
            Self::Read => "r",
            Self::Unknown(raw) => raw,
        }
    }

    /// Human-readable label for rendered output
    pub fn label(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Read => "READ",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for CdcOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_codes() {
        assert_eq!(CdcOperation::classify(Some("c")), CdcOperation::Create);
        assert_eq!(CdcOperation::classify(Some("u")), CdcOperation::Update);
        assert_eq!(CdcOperation::classify(Some("d")), CdcOperation::Delete);
        assert_eq!(CdcOperation::classify(Some("r")), CdcOperation::Read);
    }

    #[test]
    fn test_classify_unknown_code_kept_verbatim() {
        let op = CdcOperation::classify(Some("t"));
        assert_eq!(op, CdcOperation::Unknown("t".to_string()));
        assert_eq!(op.label(), "t");
    }

    #[test]
    fn test_classify_missing_code() {
        let op = CdcOperation::classify(None);
        assert_eq!(op, CdcOperation::Unknown(UNKNOWN_OP.to_string()));
    }

    #[test]
    fn test_classify_is_idempotent_over_codes() {
        let kinds = [
            CdcOperation::Create,
            CdcOperation::Update,
            CdcOperation::Delete,
            CdcOperation::Read,
            CdcOperation::Unknown("truncate".to_string()),
            CdcOperation::Unknown(UNKNOWN_OP.to_string()),
        ];
        for kind in kinds {
            assert_eq!(CdcOperation::classify(Some(kind.code())), kind);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(CdcOperation::Create.label(), "CREATE");
        assert_eq!(CdcOperation::Update.label(), "UPDATE");
        assert_eq!(CdcOperation::Delete.label(), "DELETE");
        assert_eq!(CdcOperation::Read.label(), "READ");
        assert_eq!(CdcOperation::Create.to_string(), "CREATE");
    }
}
