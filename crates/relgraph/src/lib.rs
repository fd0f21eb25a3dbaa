//! Relationship collections for an ORM object graph.
//!
//! relgraph sits between an entity's to-many relationship fields, the loader
//! that fetches related rows on first access, and the writer that streams the
//! graph out as JSON.
//!
//! # Quick Start
//!
//! ```ignore
//! use relgraph::prelude::*;
//! use std::sync::Arc;
//!
//! // A raw query template; `:order_id` is bound per owner on load.
//! let query = SqlQuery::new(source, "select id, name from line where order_id = :order_id");
//! let loader: Arc<dyn CollectionLoader<Line>> =
//!     Arc::new(SqlCollectionLoader::new(query, "order_id"));
//!
//! let lines = CollectionHelp::new(ManyType::List, "lines", Arc::new(ModelDescriptor::<Line>::new()))
//!     .with_loader(Arc::downgrade(&loader));
//!
//! // Nothing is fetched until the collection is read.
//! let reference = lines.create_reference(42_i64)?;
//! assert_eq!(reference.len()?, 3);
//!
//! // Stream it out.
//! let mut out = Vec::new();
//! let mut writer = JsonWriter::new(&mut out, JsonWriteOptions::new().include(Include::NonEmpty));
//! writer.begin_object()?;
//! lines.json_write(&mut writer, PropertyValue::from(&reference), false)?;
//! writer.end_object()?;
//! ```
//!
//! # Crates
//!
//! - `relgraph-core`: `Value`, `Row`, `Model`, `Error`
//! - `relgraph-query`: `SqlQuery` and the `RowSource` engine seam
//! - `relgraph-json`: `JsonWriter` and the `BeanDescriptor` seam
//! - `relgraph-collection`: `BeanCollection` and `CollectionHelp`

pub use relgraph_core::{
    ColumnInfo, ConfigError, ConfigErrorKind, Error, FromValue, LazyLoadError, LazyLoadErrorKind,
    Model, QueryError, QueryErrorKind, Result, Row, TypeError, Value, same_entity,
};

pub use relgraph_query::{
    BindParams, FetchStats, MemorySource, QueryCancel, QueryOptions, QueryRequest,
    RecordedRequest, RowCursor, RowSource, SqlFutureList, SqlQuery,
};

pub use relgraph_json::{BeanDescriptor, Include, JsonWriteOptions, JsonWriter, ModelDescriptor};

pub use relgraph_collection::{
    BeanCollection, CollectionHelp, CollectionLoader, Container, LoadRequest, LoadState, ManyType,
    OwnerRef, Population, PropertyValue, SqlCollectionLoader,
};

/// Render one serialization pass into a `String`.
///
/// `body` drives the writer; the document it produces is returned only if
/// every call succeeded.
pub fn to_json_string<F>(options: JsonWriteOptions, body: F) -> Result<String>
where
    F: FnOnce(&mut JsonWriter<'_>) -> Result<()>,
{
    let mut buf = Vec::new();
    {
        let mut writer = JsonWriter::new(&mut buf, options);
        body(&mut writer)?;
        writer.flush()?;
    }
    String::from_utf8(buf)
        .map_err(|e| Error::Custom(format!("writer produced invalid UTF-8: {e}")))
}

/// Prelude module for convenient imports.
///
/// ```ignore
/// use relgraph::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BeanCollection, BeanDescriptor, CollectionHelp, CollectionLoader, Container, Error,
        FromValue, Include, JsonWriteOptions, JsonWriter, ManyType, Model, ModelDescriptor,
        PropertyValue, QueryOptions, Result, Row, RowSource, SqlCollectionLoader, SqlQuery, Value,
    };
}
