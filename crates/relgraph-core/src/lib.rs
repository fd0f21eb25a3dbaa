//! Core types and traits for relgraph.
//!
//! This crate provides the foundational pieces shared by every other layer:
//!
//! - `Value` for dynamically-typed column values
//! - `Row` for one immutable result row of a raw query
//! - `FromValue` for typed, coercing reads out of a row
//! - `Model` for entities that can be folded to and from rows
//! - `Error` / `Result` used across the workspace

pub mod error;
pub mod model;
pub mod row;
pub mod value;

pub use error::{
    ConfigError, ConfigErrorKind, Error, LazyLoadError, LazyLoadErrorKind, QueryError,
    QueryErrorKind, Result, TypeError,
};
pub use model::{Model, same_entity};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
