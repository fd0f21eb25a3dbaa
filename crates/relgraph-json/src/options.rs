//! Serialization policy for one write pass.

use serde::{Deserialize, Serialize};

/// Which fields and relationships are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Include {
    /// Emit everything, including NULL fields and empty relationships.
    #[default]
    All,
    /// Skip NULL fields; empty relationships are still emitted.
    NonNull,
    /// Skip NULL fields and empty relationships.
    NonEmpty,
}

impl Include {
    /// Whether an empty relationship is written as an empty array.
    pub const fn include_empty(self) -> bool {
        matches!(self, Include::All | Include::NonNull)
    }

    /// Whether a NULL field is written as `null`.
    pub const fn include_null(self) -> bool {
        matches!(self, Include::All)
    }
}

/// Options for a [`JsonWriter`](crate::JsonWriter).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonWriteOptions {
    /// Inclusion policy for NULL fields and empty relationships.
    pub include: Include,
    /// Pretty-print with this many spaces of indentation (capped at 16).
    /// When None (default), output is compact.
    pub indent: Option<usize>,
}

impl JsonWriteOptions {
    /// Create default options: include everything, compact output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inclusion policy.
    pub fn include(mut self, include: Include) -> Self {
        self.include = include;
        self
    }

    /// Set indentation for pretty output.
    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = Some(spaces);
        self
    }

    /// Shorthand for `include_empty` of the inclusion policy.
    pub fn include_empty(&self) -> bool {
        self.include.include_empty()
    }

    /// Shorthand for `include_null` of the inclusion policy.
    pub fn include_null(&self) -> bool {
        self.include.include_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusion_matrix() {
        assert!(Include::All.include_empty());
        assert!(Include::All.include_null());
        assert!(Include::NonNull.include_empty());
        assert!(!Include::NonNull.include_null());
        assert!(!Include::NonEmpty.include_empty());
        assert!(!Include::NonEmpty.include_null());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: JsonWriteOptions = serde_json::from_str(r#"{"include":"non_empty"}"#).unwrap();
        assert_eq!(opts.include, Include::NonEmpty);
        assert_eq!(opts.indent, None);

        let opts = JsonWriteOptions::new().indent(2);
        assert!(opts.include_empty());
        assert_eq!(opts.indent, Some(2));
    }
}
