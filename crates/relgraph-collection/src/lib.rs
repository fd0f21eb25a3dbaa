//! Relationship collections for relgraph.
//!
//! - `BeanCollection` wraps a to-many relationship and loads it on first
//!   access through a weakly-held `CollectionLoader`
//! - `Container` / `ManyType` are the closed set of list, set and map shapes
//! - `CollectionHelp` is the per-relationship strategy that creates
//!   collections and serializes them through a `JsonWriter`
//! - `SqlCollectionLoader` populates a collection from a raw query

pub mod collection;
pub mod container;
pub mod help;
pub mod loader;

#[cfg(test)]
mod testing;

pub use collection::{BeanCollection, LoadState, OwnerRef};
pub use container::{Container, Iter, ManyType};
pub use help::{CollectionHelp, PropertyValue};
pub use loader::{CollectionLoader, LoadRequest, Population, SqlCollectionLoader};
