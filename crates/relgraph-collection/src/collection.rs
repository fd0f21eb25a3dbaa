//! The lazily-loaded relationship collection.

use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::{self, ThreadId};

use relgraph_core::{
    ConfigErrorKind, Error, LazyLoadErrorKind, Model, Result, Value, same_entity,
};

use crate::container::{Container, Iter, ManyType};
use crate::loader::{CollectionLoader, LoadRequest, Population};

/// Load state of a [`BeanCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Contents not fetched yet.
    Unloaded,
    /// A load is in progress on some thread.
    Loading,
    /// Contents present. Never regresses.
    Loaded,
}

/// Non-owning back-reference from a collection to the entity holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerRef {
    /// Relationship property on the owner
    pub property: String,
    /// Owner's primary key, passed to the loader
    pub parent_pk: Value,
}

/// A to-many relationship that loads its contents on first access.
///
/// The collection can be in one of three states:
/// - **Unloaded**: created as a reference, waiting for a loader
/// - **Loading**: the bound loader is running
/// - **Loaded**: contents present, either fetched or built in memory
///
/// Reads take `&self` and load on demand. Concurrent first touches from
/// several threads block on one gate so the loader runs once; a read from
/// inside the loader itself fails with a `Reentrant` lazy load error. A
/// failed load leaves the collection unloaded.
///
/// User mutations (`add`, `remove`, `clear`) take `&mut self`, load first,
/// and are tracked as additions and removals for link table maintenance.
pub struct BeanCollection<T> {
    kind: ManyType,
    contents: OnceLock<Container<T>>,
    owner: Option<OwnerRef>,
    loader: Option<Weak<dyn CollectionLoader<T>>>,
    load_gate: Mutex<()>,
    loading_thread: Mutex<Option<ThreadId>>,
    modified: bool,
    additions: Vec<T>,
    removals: Vec<T>,
}

fn lock<G>(mutex: &Mutex<G>) -> MutexGuard<'_, G> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the current thread as the loader of a collection until dropped.
///
/// Dropping also runs on unwind, so a panicking loader leaves the
/// collection `Unloaded` rather than stuck in `Loading`.
struct LoadingMarker<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> LoadingMarker<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *lock(slot) = Some(thread);
        Self { slot }
    }
}

impl Drop for LoadingMarker<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

impl<T> BeanCollection<T> {
    fn with_state(
        kind: ManyType,
        contents: OnceLock<Container<T>>,
        owner: Option<OwnerRef>,
    ) -> Self {
        Self {
            kind,
            contents,
            owner,
            loader: None,
            load_gate: Mutex::new(()),
            loading_thread: Mutex::new(None),
            modified: false,
            additions: Vec::new(),
            removals: Vec::new(),
        }
    }

    /// A fresh, empty collection that is already loaded.
    pub fn new(kind: ManyType) -> Self {
        let contents = OnceLock::from(Container::empty(&kind));
        Self::with_state(kind, contents, None)
    }

    /// Wrap an already-populated container.
    pub fn from_container(container: Container<T>) -> Self {
        let kind = container.kind();
        Self::with_state(kind, OnceLock::from(container), None)
    }

    /// An unloaded reference to the relationship of `owner`.
    pub fn reference(kind: ManyType, owner: OwnerRef) -> Self {
        Self::with_state(kind, OnceLock::new(), Some(owner))
    }

    pub fn kind(&self) -> &ManyType {
        &self.kind
    }

    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    fn property(&self) -> &str {
        self.owner.as_ref().map_or("<unowned>", |o| o.property.as_str())
    }

    pub fn load_state(&self) -> LoadState {
        if self.contents.get().is_some() {
            LoadState::Loaded
        } else if lock(&self.loading_thread).is_some() {
            LoadState::Loading
        } else {
            LoadState::Unloaded
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.contents.get().is_some()
    }

    /// Whether a loader is bound (it may have been dropped since).
    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    /// Bind the loader, replacing any earlier binding.
    ///
    /// Does not trigger loading. Fails with `LoaderRebind` once the
    /// collection is loading or loaded.
    pub fn set_loader(&mut self, loader: Weak<dyn CollectionLoader<T>>) -> Result<()> {
        if self.load_state() != LoadState::Unloaded {
            return Err(Error::config(
                ConfigErrorKind::LoaderRebind,
                format!(
                    "cannot rebind the loader of '{}' after loading started",
                    self.property()
                ),
            ));
        }
        self.loader = Some(loader);
        Ok(())
    }

    /// The loaded container, or `None` while unloaded. Never loads.
    pub fn actual_details(&self) -> Option<&Container<T>> {
        self.contents.get()
    }

    /// Load if needed and return the container.
    pub fn load(&self) -> Result<&Container<T>> {
        if let Some(container) = self.contents.get() {
            return Ok(container);
        }

        let current = thread::current().id();
        if *lock(&self.loading_thread) == Some(current) {
            return Err(Error::lazy_load(self.property(), LazyLoadErrorKind::Reentrant));
        }

        let _gate = lock(&self.load_gate);
        if let Some(container) = self.contents.get() {
            tracing::trace!(property = self.property(), "Loaded by another thread");
            return Ok(container);
        }

        let outcome = {
            let _marker = LoadingMarker::enter(&self.loading_thread, current);
            self.run_loader()
        };

        let container = outcome?;
        if self.contents.set(container).is_err() {
            tracing::warn!(property = self.property(), "Collection filled during load");
        }
        self.contents
            .get()
            .ok_or_else(|| {
                Error::Custom(format!("collection '{}' lost its contents", self.property()))
            })
    }

    #[tracing::instrument(level = "debug", skip(self), fields(property = self.property()))]
    fn run_loader(&self) -> Result<Container<T>> {
        let Some(weak) = &self.loader else {
            return Err(Error::lazy_load(self.property(), LazyLoadErrorKind::NoLoader));
        };
        let Some(loader) = weak.upgrade() else {
            tracing::warn!("Loader dropped before the collection was touched");
            return Err(Error::lazy_load(self.property(), LazyLoadErrorKind::LoaderDropped));
        };
        let request = LoadRequest {
            property: self.property().to_string(),
            parent_pk: self
                .owner
                .as_ref()
                .map_or(Value::Null, |o| o.parent_pk.clone()),
            kind: self.kind.clone(),
        };

        tracing::debug!("Lazy loading collection");
        let mut population = Population::new(&self.kind);
        loader.load_many(&request, &mut population)?;
        tracing::debug!(loaded = population.len(), "Lazy load complete");
        Ok(population.into_container())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.load()?.is_empty())
    }

    /// Iterate in the container's natural order.
    pub fn iter(&self) -> Result<Iter<'_, T>> {
        Ok(self.load()?.iter())
    }

    /// Element at `index`. Only lists are indexable.
    pub fn get(&self, index: usize) -> Result<Option<&T>> {
        if self.kind != ManyType::List {
            return Err(Error::type_mismatch("list", self.kind.to_string()));
        }
        Ok(self.load()?.get(index))
    }

    /// Consume the collection, loading it first if needed.
    pub fn into_container(self) -> Result<Container<T>> {
        self.load()?;
        self.contents
            .into_inner()
            .ok_or_else(|| Error::Custom("collection contents missing after load".to_string()))
    }

    /// Whether user code changed the collection since load or last reset.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Elements added by user code since the last reset.
    pub fn modify_additions(&self) -> &[T] {
        &self.additions
    }

    /// Elements removed by user code since the last reset.
    pub fn modify_removals(&self) -> &[T] {
        &self.removals
    }

    /// Forget modifications, e.g. after they were flushed.
    pub fn reset_modify_state(&mut self) {
        self.modified = false;
        self.additions.clear();
        self.removals.clear();
    }

    fn loaded_mut(&mut self) -> Result<&mut Container<T>> {
        self.load()?;
        let property = self.property().to_string();
        self.contents
            .get_mut()
            .ok_or_else(|| Error::Custom(format!("collection '{property}' lost its contents")))
    }
}

impl<T: Model + PartialEq> BeanCollection<T> {
    /// Membership under entity identity.
    pub fn contains(&self, bean: &T) -> Result<bool> {
        Ok(self.load()?.contains(bean))
    }

    /// Internal insert used by population and framework code: loads if
    /// needed but is not recorded as a modification.
    pub(crate) fn internal_add(&mut self, bean: T, with_check: bool) -> Result<bool> {
        Ok(self.loaded_mut()?.insert(bean, with_check))
    }
}

impl<T: Model + PartialEq + Clone> BeanCollection<T> {
    /// Add an element on behalf of user code.
    ///
    /// Sets skip an element they already hold; returns whether the
    /// collection changed.
    pub fn add(&mut self, bean: T) -> Result<bool> {
        let inserted = self.loaded_mut()?.insert(bean.clone(), true);
        if inserted {
            self.modified = true;
            self.record_addition(bean);
        }
        Ok(inserted)
    }

    /// Remove an element on behalf of user code.
    pub fn remove(&mut self, bean: &T) -> Result<bool> {
        let Some(removed) = self.loaded_mut()?.remove(bean) else {
            return Ok(false);
        };
        self.modified = true;
        self.record_removal(removed);
        Ok(true)
    }

    /// Remove every element on behalf of user code.
    pub fn clear(&mut self) -> Result<()> {
        let removed = self.loaded_mut()?.drain_all();
        if !removed.is_empty() {
            self.modified = true;
        }
        for bean in removed {
            self.record_removal(bean);
        }
        Ok(())
    }

    fn record_addition(&mut self, bean: T) {
        if let Some(index) = self.removals.iter().position(|b| same_entity(b, &bean)) {
            self.removals.remove(index);
        } else if !self.additions.iter().any(|b| same_entity(b, &bean)) {
            self.additions.push(bean);
        }
    }

    fn record_removal(&mut self, bean: T) {
        if let Some(index) = self.additions.iter().position(|b| same_entity(b, &bean)) {
            self.additions.remove(index);
        } else if !self.removals.iter().any(|b| same_entity(b, &bean)) {
            self.removals.push(bean);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BeanCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanCollection")
            .field("kind", &self.kind)
            .field("state", &self.load_state())
            .field("contents", &self.contents.get())
            .field("owner", &self.owner)
            .field("modified", &self.modified)
            .field("additions", &self.additions.len())
            .field("removals", &self.removals.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingLoader, Item, item, weak_loader};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    fn owner() -> OwnerRef {
        OwnerRef {
            property: "items".to_string(),
            parent_pk: Value::BigInt(10),
        }
    }

    fn reference_with(loader: &Arc<CountingLoader>) -> BeanCollection<Item> {
        let mut coll = BeanCollection::reference(ManyType::List, owner());
        coll.set_loader(weak_loader(loader)).unwrap();
        coll
    }

    #[test]
    fn reads_load_exactly_once() {
        let loader = Arc::new(CountingLoader::new(vec![item(1, "A"), item(2, "B")]));
        let coll = reference_with(&loader);
        assert_eq!(coll.load_state(), LoadState::Unloaded);
        assert!(coll.actual_details().is_none());
        assert_eq!(loader.calls(), 0);

        assert_eq!(coll.len().unwrap(), 2);
        assert!(coll.contains(&item(2, "B")).unwrap());
        assert_eq!(coll.get(0).unwrap(), Some(&item(1, "A")));
        assert_eq!(coll.iter().unwrap().count(), 2);

        assert_eq!(loader.calls(), 1);
        assert_eq!(coll.load_state(), LoadState::Loaded);
        assert!(!coll.is_modified());
    }

    #[test]
    fn concurrent_first_touch_loads_once() {
        let loader = Arc::new(CountingLoader {
            delay: Some(Duration::from_millis(20)),
            ..CountingLoader::new(vec![item(1, "A")])
        });
        let coll = Arc::new(reference_with(&loader));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coll = Arc::clone(&coll);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    coll.len().unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(loader.calls(), 1);
    }

    #[test]
    fn failed_load_can_be_retried() {
        let loader = Arc::new(CountingLoader::new(vec![item(1, "A")]));
        loader.fail_next.store(true, Ordering::SeqCst);
        let coll = reference_with(&loader);

        assert!(coll.len().is_err());
        assert_eq!(coll.load_state(), LoadState::Unloaded);
        assert_eq!(coll.len().unwrap(), 1);
        assert_eq!(loader.calls(), 2);
    }

    struct PanicOnceLoader {
        panicked: AtomicBool,
    }

    impl CollectionLoader<Item> for PanicOnceLoader {
        fn load_many(&self, _: &LoadRequest, population: &mut Population<Item>) -> Result<()> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("loader blew up");
            }
            population.add(item(1, "A"));
            Ok(())
        }
    }

    #[test]
    fn panicking_loader_leaves_collection_unloaded() {
        let loader = Arc::new(PanicOnceLoader {
            panicked: AtomicBool::new(false),
        });
        let mut coll = BeanCollection::reference(ManyType::List, owner());
        coll.set_loader(weak_loader(&loader)).unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| coll.len()));
        assert!(outcome.is_err());
        assert_eq!(coll.load_state(), LoadState::Unloaded);

        // Same thread retries; no stale re-entrancy marker.
        assert_eq!(coll.len().unwrap(), 1);
        assert_eq!(coll.load_state(), LoadState::Loaded);
    }

    #[test]
    fn missing_and_dropped_loaders() {
        let coll: BeanCollection<Item> = BeanCollection::reference(ManyType::Set, owner());
        let err = coll.len().unwrap_err();
        assert!(matches!(
            err,
            Error::LazyLoad(ref e) if e.kind == LazyLoadErrorKind::NoLoader && e.property == "items"
        ));

        let loader = Arc::new(CountingLoader::new(Vec::new()));
        let coll = reference_with(&loader);
        drop(loader);
        let err = coll.len().unwrap_err();
        assert!(matches!(
            err,
            Error::LazyLoad(ref e) if e.kind == LazyLoadErrorKind::LoaderDropped
        ));
    }

    #[test]
    fn rebinding_after_load_is_rejected() {
        let first = Arc::new(CountingLoader::new(Vec::new()));
        let second = Arc::new(CountingLoader::new(vec![item(1, "A")]));
        let mut coll = reference_with(&first);

        coll.set_loader(weak_loader(&second)).unwrap();
        assert_eq!(coll.len().unwrap(), 1);
        assert_eq!(first.calls(), 0);

        let err = coll.set_loader(weak_loader(&first)).unwrap_err();
        assert_eq!(err.config_kind(), Some(ConfigErrorKind::LoaderRebind));
    }

    struct ReentrantLoader {
        target: OnceLock<Weak<BeanCollection<Item>>>,
        observed: Mutex<Option<LazyLoadErrorKind>>,
    }

    impl CollectionLoader<Item> for ReentrantLoader {
        fn load_many(&self, _: &LoadRequest, population: &mut Population<Item>) -> Result<()> {
            if let Some(coll) = self.target.get().and_then(Weak::upgrade) {
                if let Err(Error::LazyLoad(e)) = coll.len() {
                    *lock(&self.observed) = Some(e.kind);
                }
            }
            population.add(item(1, "A"));
            Ok(())
        }
    }

    #[test]
    fn reentrant_touch_from_loader_fails() {
        let loader = Arc::new(ReentrantLoader {
            target: OnceLock::new(),
            observed: Mutex::new(None),
        });
        let mut coll = BeanCollection::reference(ManyType::List, owner());
        coll.set_loader(weak_loader(&loader)).unwrap();
        let coll = Arc::new(coll);
        loader.target.set(Arc::downgrade(&coll)).unwrap();

        assert_eq!(coll.len().unwrap(), 1);
        assert_eq!(*lock(&loader.observed), Some(LazyLoadErrorKind::Reentrant));
    }

    #[test]
    fn user_mutations_are_tracked() {
        let loader = Arc::new(CountingLoader::new(vec![item(1, "A"), item(2, "B")]));
        let mut coll = BeanCollection::reference(ManyType::Set, owner());
        coll.set_loader(weak_loader(&loader)).unwrap();

        assert!(coll.add(item(3, "C")).unwrap());
        assert_eq!(loader.calls(), 1);
        assert!(!coll.add(item(3, "C")).unwrap());
        assert!(coll.remove(&item(1, "A")).unwrap());
        assert!(coll.is_modified());
        assert_eq!(coll.modify_additions(), &[item(3, "C")]);
        assert_eq!(coll.modify_removals(), &[item(1, "A")]);

        assert!(coll.remove(&item(3, "C")).unwrap());
        assert!(coll.modify_additions().is_empty());

        coll.reset_modify_state();
        assert!(!coll.is_modified());
        coll.clear().unwrap();
        assert_eq!(coll.modify_removals(), &[item(2, "B")]);
        assert!(coll.is_empty().unwrap());
    }

    #[test]
    fn internal_add_is_not_a_modification() {
        let mut coll = BeanCollection::new(ManyType::Set);
        assert!(coll.internal_add(item(1, "A"), true).unwrap());
        assert!(!coll.internal_add(item(1, "A"), true).unwrap());
        assert!(coll.internal_add(item(1, "A"), false).unwrap());
        assert_eq!(coll.len().unwrap(), 2);
        assert!(!coll.is_modified());
    }

    #[test]
    fn fresh_collections_are_loaded() {
        let coll: BeanCollection<Item> = BeanCollection::new(ManyType::map("name"));
        assert_eq!(coll.load_state(), LoadState::Loaded);
        assert!(coll.get(0).is_err());

        let wrapped = BeanCollection::from_container(Container::List(vec![item(1, "A")]));
        assert_eq!(wrapped.kind(), &ManyType::List);
        assert_eq!(wrapped.into_container().unwrap().len(), 1);
    }
}
