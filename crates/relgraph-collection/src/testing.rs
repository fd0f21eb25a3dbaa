//! Fixtures shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use relgraph_core::{Error, Model, Result, Row, Value};

use crate::loader::{CollectionLoader, LoadRequest, Population};

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
}

impl Model for Item {
    const TABLE_NAME: &'static str = "item";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![("id", self.id.into()), ("name", self.name.clone().into())]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            name: row.get_named("name")?,
        })
    }

    fn primary_key_value(&self) -> Vec<Value> {
        vec![self.id.into()]
    }
}

pub fn item(id: i64, name: &str) -> Item {
    Item {
        id,
        name: name.to_string(),
    }
}

/// Loader that serves a fixed list and counts how often it is called.
#[derive(Debug, Default)]
pub struct CountingLoader {
    pub items: Vec<Item>,
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
    pub fail_next: AtomicBool,
}

impl CountingLoader {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CollectionLoader<Item> for CountingLoader {
    fn load_many(&self, _request: &LoadRequest, population: &mut Population<Item>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Custom("backing store unavailable".to_string()));
        }
        for bean in &self.items {
            population.add(bean.clone());
        }
        Ok(())
    }
}

/// Downgrade a concrete loader to the weak trait object collections hold.
pub fn weak_loader<L: CollectionLoader<Item> + 'static>(
    loader: &Arc<L>,
) -> Weak<dyn CollectionLoader<Item>> {
    let weak: Weak<L> = Arc::downgrade(loader);
    weak
}
