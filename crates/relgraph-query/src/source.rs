//! The seam to the query execution engine.
//!
//! SQL execution itself lives outside this crate. An engine plugs in by
//! implementing [`RowSource`], which opens a [`RowCursor`] that yields one
//! [`Row`] per fetch. The consumption loop in [`SqlQuery`](crate::SqlQuery)
//! decides when to fetch and when to stop.

use relgraph_core::{Result, Row, Value};

use crate::cancel::QueryCancel;
use crate::options::QueryOptions;

/// Everything the engine needs to execute one query.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// SQL with positional `?` placeholders
    pub sql: &'a str,
    /// Values for the placeholders, in order
    pub params: &'a [Value],
    /// Pass-through execution hints
    pub options: &'a QueryOptions,
    /// Cancellation flag the engine may poll to abort a running statement
    pub cancel: &'a QueryCancel,
}

/// An open result set, fetched one row at a time.
pub trait RowCursor: Send {
    /// Fetch the next row, or `None` when the result set is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Release the underlying statement. Called exactly once by the
    /// consumption loop, including after early stop, cancellation or error.
    fn close(&mut self) {}
}

/// A query engine able to open cursors.
pub trait RowSource: Send + Sync {
    /// Execute the request and return a cursor over its rows.
    fn open(&self, request: &QueryRequest<'_>) -> Result<Box<dyn RowCursor>>;
}
