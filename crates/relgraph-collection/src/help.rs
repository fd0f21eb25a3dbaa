//! Per-relationship materialization strategy.
//!
//! One `CollectionHelp` exists per to-many relationship definition and is
//! shared by every collection of that relationship. It creates collections,
//! adapts generic operations to the declared container kind, and drives
//! serialization of the contents through a [`JsonWriter`].

use std::fmt;
use std::sync::{Arc, Weak};

use relgraph_core::{Error, Model, Result, Value};
use relgraph_json::{BeanDescriptor, JsonWriter};

use crate::collection::{BeanCollection, OwnerRef};
use crate::container::{Container, ManyType};
use crate::loader::CollectionLoader;

/// The value of a relationship property as seen by framework code.
pub enum PropertyValue<'a, T> {
    /// A lazily-loading wrapper
    Collection(&'a BeanCollection<T>),
    /// A raw container with no wrapper
    Raw(&'a Container<T>),
    /// Anything else held in the property slot
    Scalar(&'a Value),
}

impl<T> Clone for PropertyValue<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyValue<'_, T> {}

impl<'a, T> From<&'a BeanCollection<T>> for PropertyValue<'a, T> {
    fn from(value: &'a BeanCollection<T>) -> Self {
        PropertyValue::Collection(value)
    }
}

impl<'a, T> From<&'a Container<T>> for PropertyValue<'a, T> {
    fn from(value: &'a Container<T>) -> Self {
        PropertyValue::Raw(value)
    }
}

impl<'a, T> From<&'a Value> for PropertyValue<'a, T> {
    fn from(value: &'a Value) -> Self {
        PropertyValue::Scalar(value)
    }
}

/// Materialization strategy for one to-many relationship.
pub struct CollectionHelp<T> {
    kind: ManyType,
    property: String,
    descriptor: Arc<dyn BeanDescriptor<T>>,
    loader: Option<Weak<dyn CollectionLoader<T>>>,
}

impl<T> CollectionHelp<T> {
    pub fn new(
        kind: ManyType,
        property: impl Into<String>,
        descriptor: Arc<dyn BeanDescriptor<T>>,
    ) -> Self {
        Self {
            kind,
            property: property.into(),
            descriptor,
            loader: None,
        }
    }

    /// Bind the loader used by collections created from now on.
    pub fn with_loader(mut self, loader: Weak<dyn CollectionLoader<T>>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Replace the loader used by collections created from now on.
    pub fn set_loader(&mut self, loader: Weak<dyn CollectionLoader<T>>) {
        self.loader = Some(loader);
    }

    pub fn kind(&self) -> &ManyType {
        &self.kind
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// A new, empty, loaded collection of this relationship's kind.
    pub fn create_empty(&self) -> BeanCollection<T> {
        BeanCollection::new(self.kind.clone())
    }

    /// An unloaded reference for the owner with `parent_pk`, bound to this
    /// relationship's loader when one is configured.
    pub fn create_reference(&self, parent_pk: impl Into<Value>) -> Result<BeanCollection<T>> {
        let mut collection = BeanCollection::reference(
            self.kind.clone(),
            OwnerRef {
                property: self.property.clone(),
                parent_pk: parent_pk.into(),
            },
        );
        if let Some(loader) = &self.loader {
            collection.set_loader(Weak::clone(loader))?;
        }
        Ok(collection)
    }

    /// The raw container behind `value`.
    ///
    /// A wrapped collection is loaded first. A raw container is returned as
    /// is. Anything else, or a container of a different kind than this
    /// relationship declares, is a type mismatch.
    pub fn underlying<'a>(&self, value: PropertyValue<'a, T>) -> Result<&'a Container<T>> {
        let container = match value {
            PropertyValue::Collection(collection) => collection.load()?,
            PropertyValue::Raw(container) => container,
            PropertyValue::Scalar(other) => {
                return Err(self.mismatch(other.type_name().to_string()));
            }
        };
        if !container.is_kind(&self.kind) {
            return Err(self.mismatch(container.kind().to_string()));
        }
        Ok(container)
    }

    fn mismatch(&self, actual: String) -> Error {
        let mut err = Error::type_mismatch("relationship collection", actual);
        if let Error::Type(ref mut type_error) = err {
            type_error.column = Some(self.property.clone());
        }
        err
    }

    /// Write the relationship under its property name.
    ///
    /// An unloaded wrapper is skipped unless `explicit_include` asks for it,
    /// in which case it is loaded first.
    pub fn json_write(
        &self,
        ctx: &mut JsonWriter<'_>,
        value: PropertyValue<'_, T>,
        explicit_include: bool,
    ) -> Result<()> {
        let unloaded = matches!(value, PropertyValue::Collection(c) if !c.is_loaded());
        if unloaded && !explicit_include {
            tracing::trace!(property = %self.property, "Skipping unloaded relationship");
            return Ok(());
        }
        let container = self.underlying(value)?;
        self.json_write_collection(ctx, &self.property, container)
    }

    /// Write `elements` as an array named `name`.
    ///
    /// An empty collection produces nothing at all unless the writer's
    /// policy includes empty relationships.
    pub fn json_write_collection(
        &self,
        ctx: &mut JsonWriter<'_>,
        name: &str,
        elements: &Container<T>,
    ) -> Result<()> {
        if elements.is_empty() && !ctx.include_empty() {
            return Ok(());
        }
        ctx.begin_assoc_many(name)?;
        for element in elements {
            self.json_write_element(ctx, element)?;
        }
        ctx.end_assoc_many()
    }

    /// Write one element through the target entity's descriptor.
    pub fn json_write_element(&self, ctx: &mut JsonWriter<'_>, element: &T) -> Result<()> {
        self.descriptor.json_write(ctx, element)
    }
}

impl<T: Model + PartialEq> CollectionHelp<T> {
    /// Insert on behalf of framework code.
    ///
    /// An unloaded collection is loaded before inserting, whether or not
    /// the insert is checked. The insert is not recorded as a modification.
    pub fn add(
        &self,
        collection: &mut BeanCollection<T>,
        bean: T,
        with_check: bool,
    ) -> Result<bool> {
        collection.internal_add(bean, with_check)
    }
}

impl<T> fmt::Debug for CollectionHelp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHelp")
            .field("kind", &self.kind)
            .field("property", &self.property)
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}
