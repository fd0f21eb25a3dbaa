//! Lazy loading of relationship collections through raw queries.

use std::sync::{Arc, Barrier};

use relgraph::prelude::*;
use relgraph::{LazyLoadErrorKind, LoadState, MemorySource};

#[derive(Debug, Clone, PartialEq)]
struct Line {
    id: i64,
    sku: String,
}

impl Model for Line {
    const TABLE_NAME: &'static str = "order_line";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![("id", self.id.into()), ("sku", self.sku.clone().into())]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            sku: row.get_named("sku")?,
        })
    }

    fn primary_key_value(&self) -> Vec<Value> {
        vec![self.id.into()]
    }
}

fn line_source() -> Arc<MemorySource> {
    Arc::new(MemorySource::new(
        vec!["ID".to_string(), "SKU".to_string()],
        vec![
            vec![Value::BigInt(1), Value::Text("apple".into())],
            vec![Value::BigInt(2), Value::Text("pear".into())],
            vec![Value::BigInt(3), Value::Text("plum".into())],
        ],
    ))
}

fn lines_help(
    source: &Arc<MemorySource>,
) -> (CollectionHelp<Line>, Arc<dyn CollectionLoader<Line>>) {
    let query = SqlQuery::new(
        source.clone(),
        "select id, sku from order_line where order_id = :order_id order by id",
    );
    let loader: Arc<dyn CollectionLoader<Line>> =
        Arc::new(SqlCollectionLoader::new(query, "order_id"));
    let help = CollectionHelp::new(
        ManyType::List,
        "lines",
        Arc::new(ModelDescriptor::<Line>::new()),
    )
    .with_loader(Arc::downgrade(&loader));
    (help, loader)
}

#[test]
fn reference_loads_once_on_first_read() {
    let source = line_source();
    let (help, _loader) = lines_help(&source);
    let lines = help.create_reference(42_i64).unwrap();

    assert_eq!(lines.load_state(), LoadState::Unloaded);
    assert_eq!(source.stats().opened(), 0);

    assert_eq!(lines.len().unwrap(), 3);
    let skus: Vec<&str> = lines.iter().unwrap().map(|l| l.sku.as_str()).collect();
    assert_eq!(skus, vec!["apple", "pear", "plum"]);
    assert!(lines.contains(&Line { id: 2, sku: "pear".into() }).unwrap());

    assert_eq!(source.stats().opened(), 1);
    assert_eq!(source.stats().closed(), 1);
    let request = source.last_request().unwrap();
    assert_eq!(request.params, vec![Value::BigInt(42)]);
    assert!(request.sql.contains("order_id = ?"));
}

#[test]
fn concurrent_readers_share_one_load() {
    let source = line_source();
    let (help, _loader) = lines_help(&source);
    let lines = Arc::new(help.create_reference(7_i64).unwrap());
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let lines = Arc::clone(&lines);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                lines.len().unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
    assert_eq!(source.stats().opened(), 1);
}

#[test]
fn dropped_loader_is_reported() {
    let source = line_source();
    let (help, loader) = lines_help(&source);
    let lines = help.create_reference(1_i64).unwrap();
    drop(loader);

    match lines.len() {
        Err(Error::LazyLoad(e)) => {
            assert_eq!(e.kind, LazyLoadErrorKind::LoaderDropped);
            assert_eq!(e.property, "lines");
        }
        other => panic!("expected lazy load error, got {other:?}"),
    }
}

#[test]
fn user_edits_after_load_are_tracked() {
    let source = line_source();
    let (help, _loader) = lines_help(&source);
    let mut lines = help.create_reference(1_i64).unwrap();

    let extra = Line { id: 4, sku: "fig".into() };
    assert!(lines.add(extra.clone()).unwrap());
    assert!(lines.remove(&Line { id: 1, sku: "apple".into() }).unwrap());

    assert!(lines.is_modified());
    assert_eq!(lines.modify_additions(), &[extra]);
    assert_eq!(lines.modify_removals().len(), 1);
    assert_eq!(lines.len().unwrap(), 3);
    assert_eq!(source.stats().opened(), 1);
}
