//! Execution hints for raw queries.

use serde::{Deserialize, Serialize};

/// Pagination and fetch hints passed through to the row source.
///
/// None of these change the semantics of the streaming contract; they are
/// stored on the query and handed to the engine unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Number of leading rows to skip (0 = none)
    pub first_row: usize,
    /// Maximum number of rows to return (0 = unlimited)
    pub max_rows: usize,
    /// Statement timeout in seconds (0 = unlimited)
    pub timeout_secs: u64,
    /// Advisory fetch buffer size (0 = engine default)
    pub buffer_fetch_size_hint: usize,
}

impl QueryOptions {
    /// Create options with every hint unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first row to return.
    pub fn first_row(mut self, n: usize) -> Self {
        self.first_row = n;
        self
    }

    /// Set the maximum number of rows.
    pub fn max_rows(mut self, n: usize) -> Self {
        self.max_rows = n;
        self
    }

    /// Set the statement timeout.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the fetch buffer hint.
    pub fn buffer_fetch_size_hint(mut self, n: usize) -> Self {
        self.buffer_fetch_size_hint = n;
        self
    }

    /// Whether a row limit applies.
    pub fn has_max_rows(&self) -> bool {
        self.max_rows > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_hints() {
        let opts = QueryOptions::new()
            .first_row(10)
            .max_rows(5)
            .timeout(30)
            .buffer_fetch_size_hint(100);
        assert_eq!(opts.first_row, 10);
        assert_eq!(opts.max_rows, 5);
        assert_eq!(opts.timeout_secs, 30);
        assert_eq!(opts.buffer_fetch_size_hint, 100);
        assert!(opts.has_max_rows());
        assert!(!QueryOptions::default().has_max_rows());
    }
}
