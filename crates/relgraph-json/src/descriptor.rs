//! Per-entity serialization seam.

use std::fmt;
use std::marker::PhantomData;

use relgraph_core::{Model, Result};

use crate::writer::JsonWriter;

/// Knows how to write one entity instance as a structure.
///
/// Relationship serialization iterates a collection and delegates every
/// element here; it never inspects an entity's own fields.
pub trait BeanDescriptor<T>: Send + Sync {
    /// Write `bean` as one complete object at the writer's current position.
    fn json_write(&self, ctx: &mut JsonWriter<'_>, bean: &T) -> Result<()>;
}

/// Descriptor that writes a model's scalar columns in declaration order.
pub struct ModelDescriptor<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ModelDescriptor<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ModelDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ModelDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Model> BeanDescriptor<T> for ModelDescriptor<T> {
    fn json_write(&self, ctx: &mut JsonWriter<'_>, bean: &T) -> Result<()> {
        ctx.begin_object()?;
        for (name, value) in bean.to_row() {
            ctx.write_field(name, &value)?;
        }
        ctx.end_object()
    }
}
