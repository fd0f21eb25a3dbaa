//! Structured output for relgraph object graphs.
//!
//! - `JsonWriter` is the streaming sink for one serialization pass
//! - `JsonWriteOptions` / `Include` carry the null and empty-relationship policy
//! - `BeanDescriptor` is the per-entity serializer seam, with
//!   `ModelDescriptor` as the column-based default

pub mod descriptor;
pub mod options;
pub mod writer;

pub use descriptor::{BeanDescriptor, ModelDescriptor};
pub use options::{Include, JsonWriteOptions};
pub use writer::JsonWriter;
