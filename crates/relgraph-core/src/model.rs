//! Model trait for entities that fold to and from rows.
//!
//! A `Model` is the minimal view relgraph needs of a persisted entity: its
//! table, its primary key, and a column view of its scalar state. Per-type
//! serialization logic lives behind the descriptor seam in `relgraph-json`.

use crate::Result;
use crate::row::Row;
use crate::value::Value;

/// Trait for types that map to a database table.
///
/// # Example
///
/// ```ignore
/// impl Model for Customer {
///     const TABLE_NAME: &'static str = "customer";
///     const PRIMARY_KEY: &'static [&'static str] = &["id"];
///
///     fn to_row(&self) -> Vec<(&'static str, Value)> {
///         vec![("id", self.id.into()), ("name", self.name.clone().into())]
///     }
///
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Self { id: row.get_named("id")?, name: row.get_named("name")? })
///     }
///
///     fn primary_key_value(&self) -> Vec<Value> {
///         vec![self.id.into()]
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// The primary key column name(s).
    const PRIMARY_KEY: &'static [&'static str];

    /// Convert this model instance to its scalar columns, in declaration order.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Construct a model instance from a fetched row.
    fn from_row(row: &Row) -> Result<Self>;

    /// Get the value of the primary key field(s).
    fn primary_key_value(&self) -> Vec<Value>;

    /// Check if this is a new record (no primary key assigned yet).
    fn is_new(&self) -> bool {
        self.primary_key_value().iter().all(Value::is_null)
    }

    /// Look up one scalar column by name.
    fn column_value(&self, column: &str) -> Option<Value> {
        self.to_row()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// Entity identity: equal primary keys when both sides are persisted,
/// structural equality otherwise.
pub fn same_entity<T: Model + PartialEq>(a: &T, b: &T) -> bool {
    if a.is_new() || b.is_new() {
        a == b
    } else {
        a.primary_key_value() == b.primary_key_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        id: Option<i64>,
        label: String,
    }

    impl Model for Tag {
        const TABLE_NAME: &'static str = "tag";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", self.id.into()), ("label", self.label.clone().into())]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get_named("id")?,
                label: row.get_named("label")?,
            })
        }

        fn primary_key_value(&self) -> Vec<Value> {
            vec![self.id.into()]
        }
    }

    fn tag(id: Option<i64>, label: &str) -> Tag {
        Tag {
            id,
            label: label.to_string(),
        }
    }

    #[test]
    fn persisted_entities_compare_by_key() {
        assert!(same_entity(&tag(Some(1), "a"), &tag(Some(1), "renamed")));
        assert!(!same_entity(&tag(Some(1), "a"), &tag(Some(2), "a")));
    }

    #[test]
    fn new_entities_compare_structurally() {
        assert!(tag(None, "a").is_new());
        assert!(same_entity(&tag(None, "a"), &tag(None, "a")));
        assert!(!same_entity(&tag(None, "a"), &tag(None, "b")));
        assert!(!same_entity(&tag(None, "a"), &tag(Some(1), "a")));
    }

    #[test]
    fn column_value_and_round_trip() {
        let t = tag(Some(5), "x");
        assert_eq!(t.column_value("label"), Some(Value::Text("x".into())));
        assert_eq!(t.column_value("nope"), None);

        let row = Row::new(
            vec!["id".to_string(), "label".to_string()],
            vec![Value::BigInt(5), Value::Text("x".into())],
        );
        assert_eq!(Tag::from_row(&row).unwrap(), t);
    }
}
