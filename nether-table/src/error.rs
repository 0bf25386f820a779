//! Table engine error types

/// Errors surfaced by schema parsing and field writes.
///
/// Rendering (`to_text`) never fails; it degrades to a raw textual form
/// instead. Only writes and table definitions report errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// Malformed schema text. The whole table definition is rejected.
    #[error("Invalid field format `{token}`: {reason}")]
    SchemaSyntax { token: String, reason: String },

    /// Text did not match any option, exactly or partially.
    #[error("`{text}` does not match any option in `{table}`")]
    EnumResolution { text: String, table: String },

    /// Pointer destination lies outside the data.
    #[error("Destination {address:06X} is outside the data ({len} bytes)")]
    OutOfRangeDestination { address: usize, len: usize },

    /// Pointer text named an anchor that does not exist.
    #[error("No anchor named `{0}`")]
    UnresolvedAnchor(String),

    /// Table lookup by field name failed.
    #[error("No field named `{0}`")]
    UnknownField(String),

    /// Element index past the end of the table.
    #[error("Element {index} is outside the table ({count} elements)")]
    ElementOutOfRange { index: usize, count: usize },

    /// Pointer inner format has no strategy that can materialize it.
    #[error("No format strategy for `<{0}>`")]
    UnknownInnerFormat(String),
}

impl TableError {
    pub(crate) fn syntax(token: &str, reason: impl Into<String>) -> Self {
        TableError::SchemaSyntax {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TableError::syntax("hp|s=(", "missing match field").to_string(),
            "Invalid field format `hp|s=(`: missing match field"
        );
        assert_eq!(
            TableError::OutOfRangeDestination {
                address: 0x1234,
                len: 0x100
            }
            .to_string(),
            "Destination 001234 is outside the data (256 bytes)"
        );
        assert_eq!(
            TableError::UnresolvedAnchor("items".into()).to_string(),
            "No anchor named `items`"
        );
    }
}
