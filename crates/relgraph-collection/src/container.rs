//! The concrete containers behind a relationship.

use std::fmt;

use relgraph_core::{Model, Value, same_entity};

/// Declared container kind of a to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManyType {
    /// Ordered, duplicates allowed.
    List,
    /// Insertion-ordered, unique by entity identity.
    Set,
    /// Insertion-ordered, keyed by one scalar column of the element.
    Map { key_property: String },
}

impl ManyType {
    /// A map keyed by `key_property`.
    pub fn map(key_property: impl Into<String>) -> Self {
        ManyType::Map {
            key_property: key_property.into(),
        }
    }
}

impl fmt::Display for ManyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManyType::List => write!(f, "list"),
            ManyType::Set => write!(f, "set"),
            ManyType::Map { key_property } => write!(f, "map by '{}'", key_property),
        }
    }
}

/// The raw collection of actual elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Container<T> {
    List(Vec<T>),
    Set(Vec<T>),
    Map {
        key_property: String,
        entries: Vec<(Value, T)>,
    },
}

impl<T> Container<T> {
    /// An empty container of the given kind.
    pub fn empty(kind: &ManyType) -> Self {
        match kind {
            ManyType::List => Container::List(Vec::new()),
            ManyType::Set => Container::Set(Vec::new()),
            ManyType::Map { key_property } => Container::Map {
                key_property: key_property.clone(),
                entries: Vec::new(),
            },
        }
    }

    /// The kind this container implements.
    pub fn kind(&self) -> ManyType {
        match self {
            Container::List(_) => ManyType::List,
            Container::Set(_) => ManyType::Set,
            Container::Map { key_property, .. } => ManyType::map(key_property.clone()),
        }
    }

    /// Whether this container implements `kind`.
    pub fn is_kind(&self, kind: &ManyType) -> bool {
        match (self, kind) {
            (Container::List(_), ManyType::List) | (Container::Set(_), ManyType::Set) => true,
            (Container::Map { key_property, .. }, ManyType::Map { key_property: k }) => {
                key_property == k
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Container::List(v) | Container::Set(v) => v.len(),
            Container::Map { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate elements in natural order (insertion or load order).
    pub fn iter(&self) -> Iter<'_, T> {
        match self {
            Container::List(v) | Container::Set(v) => Iter::Elements(v.iter()),
            Container::Map { entries, .. } => Iter::Entries(entries.iter()),
        }
    }

    /// Element at `index` in iteration order.
    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            Container::List(v) | Container::Set(v) => v.get(index),
            Container::Map { entries, .. } => entries.get(index).map(|(_, bean)| bean),
        }
    }

    /// Map lookup by key. Always `None` for lists and sets.
    pub fn get_by_key(&self, key: &Value) -> Option<&T> {
        match self {
            Container::Map { entries, .. } => {
                entries.iter().find(|(k, _)| k == key).map(|(_, bean)| bean)
            }
            _ => None,
        }
    }

    /// Remove every element, returning them in iteration order.
    pub fn drain_all(&mut self) -> Vec<T> {
        match self {
            Container::List(v) | Container::Set(v) => std::mem::take(v),
            Container::Map { entries, .. } => {
                std::mem::take(entries).into_iter().map(|(_, bean)| bean).collect()
            }
        }
    }
}

impl<T: Model + PartialEq> Container<T> {
    /// Membership under entity identity.
    pub fn contains(&self, bean: &T) -> bool {
        self.iter().any(|existing| same_entity(existing, bean))
    }

    /// Insert `bean`, returning whether the container changed.
    ///
    /// With `with_check`, a set skips an element it already holds. Lists
    /// never check. Maps always store under the element's key column,
    /// replacing an existing entry with the same key in place.
    pub fn insert(&mut self, bean: T, with_check: bool) -> bool {
        match self {
            Container::List(v) => {
                v.push(bean);
                true
            }
            Container::Set(v) => {
                if with_check && v.iter().any(|existing| same_entity(existing, &bean)) {
                    return false;
                }
                v.push(bean);
                true
            }
            Container::Map {
                key_property,
                entries,
            } => {
                let key = bean.column_value(key_property).unwrap_or(Value::Null);
                if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = bean;
                } else {
                    entries.push((key, bean));
                }
                true
            }
        }
    }

    /// Remove the first element with the same identity as `bean`.
    pub fn remove(&mut self, bean: &T) -> Option<T> {
        match self {
            Container::List(v) | Container::Set(v) => {
                let index = v.iter().position(|existing| same_entity(existing, bean))?;
                Some(v.remove(index))
            }
            Container::Map { entries, .. } => {
                let index = entries
                    .iter()
                    .position(|(_, existing)| same_entity(existing, bean))?;
                Some(entries.remove(index).1)
            }
        }
    }
}

/// Iterator over the elements of a [`Container`].
pub enum Iter<'a, T> {
    Elements(std::slice::Iter<'a, T>),
    Entries(std::slice::Iter<'a, (Value, T)>),
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Elements(it) => it.next(),
            Iter::Entries(it) => it.next().map(|(_, bean)| bean),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Elements(it) => it.size_hint(),
            Iter::Entries(it) => it.size_hint(),
        }
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a Container<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
