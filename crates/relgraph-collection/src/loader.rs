//! Deferred population of relationship collections.

use std::fmt;

use relgraph_core::{Model, Result, Value};
use relgraph_query::SqlQuery;

use crate::container::{Container, ManyType};

/// What a loader is asked to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Relationship property on the owning entity
    pub property: String,
    /// Primary key of the owning entity
    pub parent_pk: Value,
    /// Container kind being populated
    pub kind: ManyType,
}

/// The original contents of a collection, filled by its loader.
///
/// Population builds the loaded state; it is never recorded as a
/// modification of the collection.
#[derive(Debug)]
pub struct Population<T> {
    container: Container<T>,
}

impl<T> Population<T> {
    pub(crate) fn new(kind: &ManyType) -> Self {
        Self {
            container: Container::empty(kind),
        }
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    pub(crate) fn into_container(self) -> Container<T> {
        self.container
    }
}

impl<T: Model + PartialEq> Population<T> {
    /// Add an element without a uniqueness check.
    ///
    /// For loaders whose source already guarantees distinct rows.
    pub fn add(&mut self, bean: T) {
        self.container.insert(bean, false);
    }

    /// Add an element, skipping it if a set already holds it.
    pub fn add_checked(&mut self, bean: T) -> bool {
        self.container.insert(bean, true)
    }
}

/// Populates an unloaded collection on first access.
///
/// A collection holds its loader weakly and calls it at most once per
/// successful load.
pub trait CollectionLoader<T>: Send + Sync {
    fn load_many(&self, request: &LoadRequest, population: &mut Population<T>) -> Result<()>;
}

/// Loads a relationship by running a raw query per owner.
///
/// The template query is cloned for each load, the owner's primary key is
/// bound to `parent_param`, and rows are streamed straight into the
/// population through `Model::from_row`.
pub struct SqlCollectionLoader {
    query: SqlQuery,
    parent_param: String,
}

impl SqlCollectionLoader {
    pub fn new(query: SqlQuery, parent_param: impl Into<String>) -> Self {
        Self {
            query,
            parent_param: parent_param.into(),
        }
    }
}

impl fmt::Debug for SqlCollectionLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCollectionLoader")
            .field("sql", &self.query.sql())
            .field("parent_param", &self.parent_param)
            .finish()
    }
}

impl<T: Model + PartialEq> CollectionLoader<T> for SqlCollectionLoader {
    fn load_many(&self, request: &LoadRequest, population: &mut Population<T>) -> Result<()> {
        let mut query = self.query.clone();
        query.set_parameter(&self.parent_param, request.parent_pk.clone())?;
        query.find_each(|row| {
            population.add(T::from_row(row)?);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Item, item};
    use relgraph_query::MemorySource;
    use std::sync::Arc;

    #[test]
    fn population_check_only_applies_when_asked() {
        let mut population = Population::new(&ManyType::Set);
        population.add(item(1, "A"));
        population.add(item(1, "A"));
        assert_eq!(population.len(), 2);
        assert!(!population.add_checked(item(1, "A")));
        assert_eq!(population.len(), 2);
    }

    #[test]
    fn sql_loader_binds_parent_and_streams_rows() {
        let source = Arc::new(MemorySource::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Value::BigInt(1), Value::Text("A".into())],
                vec![Value::BigInt(2), Value::Text("B".into())],
            ],
        ));
        let query = SqlQuery::new(
            source.clone(),
            "select id, name from item where order_id = :order_id",
        );
        let loader = SqlCollectionLoader::new(query, "order_id");
        let request = LoadRequest {
            property: "items".to_string(),
            parent_pk: Value::BigInt(42),
            kind: ManyType::List,
        };

        let mut population = Population::<Item>::new(&ManyType::List);
        loader.load_many(&request, &mut population).unwrap();

        let loaded: Vec<Item> = population.into_container().drain_all();
        assert_eq!(loaded, vec![item(1, "A"), item(2, "B")]);

        let recorded = source.last_request().unwrap();
        assert_eq!(recorded.sql, "select id, name from item where order_id = ?");
        assert_eq!(recorded.params, vec![Value::BigInt(42)]);
        assert_eq!(source.stats().closed(), 1);
    }
}
