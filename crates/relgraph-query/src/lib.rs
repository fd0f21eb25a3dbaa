//! Raw SQL queries for relgraph.
//!
//! `SqlQuery` binds parameters, carries pass-through execution hints, and
//! consumes results either eagerly or as a stream of rows with at most one
//! row resident at a time. Execution is delegated to a [`RowSource`].

pub mod cancel;
pub mod future;
pub mod memory;
pub mod options;
pub mod params;
pub mod query;
pub mod source;

pub use cancel::QueryCancel;
pub use future::SqlFutureList;
pub use memory::{FetchStats, MemorySource, RecordedRequest};
pub use options::QueryOptions;
pub use params::BindParams;
pub use query::SqlQuery;
pub use source::{QueryRequest, RowCursor, RowSource};
