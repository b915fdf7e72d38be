//! The local document store.
//!
//! [`LocalStore`] keeps every collection in a single blob inside a [`KeyValueStorage`].
//! Every write follows the same protocol:
//!
//! 1. load the entire database,
//! 2. mutate one entry,
//! 3. persist the entire database and publish a [`StorageEvent`] on the [`ChangeBus`],
//! 4. notify this store's listeners on the affected collection and document.
//!
//! Writes issued through one store are serialized. Writes issued from different contexts
//! sharing the same storage are not: two racing read-modify-write cycles can lose one of
//! the updates, and the last persisted blob wins.
//!
//! When another context publishes a change for the store's key, the store reloads the
//! database once and hands a fresh snapshot to every registered listener.
//!
//! # Example
//!
//! ```ignore
//! use localdoc_core::store::{LocalStore, StoreBuilder, SetOptions};
//!
//! let store = LocalStore::builder()
//!     .with_storage(storage)
//!     .with_bus(bus)
//!     .build()
//!     .await?;
//!
//! let prets = store.collection("prets");
//! let loan = store.add_doc(&prets, fields).await?;
//! store.update_doc(&loan, repaid).await?;
//! ```

use std::{
    fmt,
    sync::{
        Arc, Mutex as StdMutex, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use log::{debug, trace, warn};
use mea::mutex::Mutex;

use crate::{
    config::{IdStrategy, StoreConfig},
    document::{Database, Fields},
    error::{LocalStoreError, LocalStoreResult},
    listener::{ErrorCallback, ListenerRegistry, SnapshotCallback, Subscription},
    reference::{CollectionReference, DocumentReference, Reference, doc_with},
    snapshot::{DocumentSnapshot, QuerySnapshot, Snapshot},
    storage::{
        BusSubscription, ChangeBus, ChangeHandler, DetachedBus, KeyValueStorage, StorageError,
        StorageEvent,
    },
};

/// Options for [`LocalStore::set_doc`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Shallowly merge into an existing document instead of replacing it.
    pub merge: bool,
}

impl SetOptions {
    /// Replace the document's fields entirely.
    pub fn overwrite() -> Self {
        Self { merge: false }
    }

    /// Merge top-level fields into the existing document, if any.
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// A document store persisted as one blob in a key-value substrate.
///
/// `LocalStore` is cheap to clone; clones share the same listeners and bus registration.
/// The bus registration is released by [`shutdown`](LocalStore::shutdown) or when the last
/// clone is dropped.
#[derive(Debug, Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: StoreConfig,
    storage: Arc<dyn KeyValueStorage>,
    bus: Arc<dyn ChangeBus>,
    listeners: Arc<ListenerRegistry>,
    write_lock: Mutex<()>,
    bus_subscription: StdMutex<Option<BusSubscription>>,
    closed: AtomicBool,
}

impl LocalStore {
    /// Creates a store over `storage`, subscribed to changes from other contexts on `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Initialization`] if the configured storage key is empty.
    pub fn new(
        config: StoreConfig,
        storage: Arc<dyn KeyValueStorage>,
        bus: Arc<dyn ChangeBus>,
    ) -> LocalStoreResult<Self> {
        if config.storage_key.is_empty() {
            return Err(LocalStoreError::Initialization(
                "storage key must not be empty".to_string(),
            ));
        }

        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner>| {
            let weak = weak.clone();
            let handler: ChangeHandler = Arc::new(move |event: &StorageEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_external_change(event);
                }
            });
            let subscription = bus.subscribe(handler);

            StoreInner {
                config,
                storage,
                bus,
                listeners: Arc::new(ListenerRegistry::default()),
                write_lock: Mutex::new(()),
                bus_subscription: StdMutex::new(Some(subscription)),
                closed: AtomicBool::new(false),
            }
        });

        debug!("opened local store on key {}", inner.config.storage_key);

        Ok(Self { inner })
    }

    /// Creates a builder for configuring a store.
    pub fn builder() -> LocalStoreBuilder {
        LocalStoreBuilder::default()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Returns a reference to the collection at `path`.
    pub fn collection(&self, path: &str) -> CollectionReference {
        CollectionReference::new(path)
    }

    /// Returns a reference to a document, generating its id with the configured
    /// [`IdStrategy`] when `id` is `None` or empty.
    pub fn doc(&self, collection_path: &str, id: Option<&str>) -> DocumentReference {
        doc_with(collection_path, id, self.inner.config.id_strategy)
    }

    /// Reads a single document. A missing document is a successful, non-existent snapshot.
    pub async fn get_doc(
        &self,
        reference: &DocumentReference,
    ) -> LocalStoreResult<DocumentSnapshot> {
        let db = self.inner.load();

        Ok(document_snapshot(&db, reference))
    }

    /// Reads every document of a collection, ordered by id.
    pub async fn get_docs(
        &self,
        collection: &CollectionReference,
    ) -> LocalStoreResult<QuerySnapshot> {
        let db = self.inner.load();

        Ok(query_snapshot(&db, collection))
    }

    /// Stores `fields` as a new document with a generated id.
    ///
    /// # Returns
    ///
    /// A reference to the new document.
    pub async fn add_doc(
        &self,
        collection: &CollectionReference,
        fields: Fields,
    ) -> LocalStoreResult<DocumentReference> {
        let reference = collection.doc(self.id_strategy().generate());

        {
            let _guard = self.inner.write_lock.lock().await;
            let mut db = self.inner.load();
            db.put(collection.path(), reference.id(), fields);
            self.inner.persist(&db);
        }

        debug!("added document {reference}");
        self.inner.notify_write(&reference);

        Ok(reference)
    }

    /// Creates or replaces a document.
    ///
    /// With [`SetOptions::merge`], an existing document keeps the fields not mentioned in
    /// `fields`. The merge is shallow: a nested object in `fields` replaces the stored one.
    pub async fn set_doc(
        &self,
        reference: &DocumentReference,
        fields: Fields,
        options: SetOptions,
    ) -> LocalStoreResult<()> {
        {
            let _guard = self.inner.write_lock.lock().await;
            let mut db = self.inner.load();
            let collection = reference.collection_path();

            if options.merge && db.document(collection, reference.id()).is_some() {
                db.merge(collection, reference.id(), fields);
            } else {
                db.put(collection, reference.id(), fields);
            }

            self.inner.persist(&db);
        }

        debug!("set document {reference} (merge: {})", options.merge);
        self.inner.notify_write(reference);

        Ok(())
    }

    /// Shallowly merges `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::NotFound`] if no document exists at `reference`.
    pub async fn update_doc(
        &self,
        reference: &DocumentReference,
        fields: Fields,
    ) -> LocalStoreResult<()> {
        {
            let _guard = self.inner.write_lock.lock().await;
            let mut db = self.inner.load();

            if !db.merge(reference.collection_path(), reference.id(), fields) {
                return Err(LocalStoreError::NotFound(reference.path().to_string()));
            }

            self.inner.persist(&db);
        }

        debug!("updated document {reference}");
        self.inner.notify_write(reference);

        Ok(())
    }

    /// Deletes a document. Deleting a missing document is a no-op.
    pub async fn delete_doc(&self, reference: &DocumentReference) -> LocalStoreResult<()> {
        {
            let _guard = self.inner.write_lock.lock().await;
            let mut db = self.inner.load();

            if db.collection(reference.collection_path()).is_some() {
                db.remove(reference.collection_path(), reference.id());
                self.inner.persist(&db);
            }
        }

        debug!("deleted document {reference}");
        self.inner.notify_write(reference);

        Ok(())
    }

    /// Lists the paths of every persisted collection.
    pub async fn list_collections(&self) -> LocalStoreResult<Vec<String>> {
        Ok(self
            .inner
            .load()
            .collection_paths()
            .map(str::to_string)
            .collect())
    }

    /// Returns a copy of the whole persisted database.
    pub async fn export(&self) -> LocalStoreResult<Database> {
        Ok(self.inner.load())
    }

    /// Replaces the whole persisted database and refreshes every listener.
    pub async fn import(&self, db: Database) -> LocalStoreResult<()> {
        {
            let _guard = self.inner.write_lock.lock().await;
            self.inner.persist(&db);
        }

        debug!("imported database into {}", self.inner.config.storage_key);
        self.inner.refresh_all();

        Ok(())
    }

    /// Removes the persisted database and refreshes every listener.
    ///
    /// # Errors
    ///
    /// Unlike the document operations, this reports a failing storage as
    /// [`LocalStoreError::Storage`].
    pub async fn clear(&self) -> LocalStoreResult<()> {
        {
            let _guard = self.inner.write_lock.lock().await;
            self.inner
                .storage
                .remove_item(&self.inner.config.storage_key)?;
            self.inner
                .bus
                .publish(StorageEvent::new(self.inner.config.storage_key.clone(), None));
        }

        debug!("cleared database {}", self.inner.config.storage_key);
        self.inner.refresh_all();

        Ok(())
    }

    /// Registers a live listener on a collection or a document.
    ///
    /// `on_next` is called once right away with the current state, then after every change
    /// affecting the reference. Delivery continues until the returned
    /// [`Subscription`] is unsubscribed.
    pub fn on_snapshot<F>(&self, reference: impl Into<Reference>, on_next: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.subscribe(reference.into(), Arc::new(on_next), None)
    }

    /// Like [`on_snapshot`](LocalStore::on_snapshot), routing a failure to produce the
    /// initial snapshot to `on_error` instead of the log.
    pub fn on_snapshot_with_error<F, E>(
        &self,
        reference: impl Into<Reference>,
        on_next: F,
        on_error: E,
    ) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
        E: Fn(&LocalStoreError) + Send + Sync + 'static,
    {
        self.subscribe(reference.into(), Arc::new(on_next), Some(Arc::new(on_error)))
    }

    /// Registers a live listener on a single document.
    pub fn on_doc_snapshot<F>(&self, reference: &DocumentReference, on_next: F) -> Subscription
    where
        F: Fn(&DocumentSnapshot) + Send + Sync + 'static,
    {
        let callback: SnapshotCallback = Arc::new(move |snapshot: &Snapshot| {
            if let Snapshot::Document(snapshot) = snapshot {
                on_next(snapshot);
            }
        });

        self.subscribe(reference.into(), callback, None)
    }

    /// Registers a live listener on every document of a collection.
    pub fn on_collection_snapshot<F>(
        &self,
        collection: &CollectionReference,
        on_next: F,
    ) -> Subscription
    where
        F: Fn(&QuerySnapshot) + Send + Sync + 'static,
    {
        let callback: SnapshotCallback = Arc::new(move |snapshot: &Snapshot| {
            if let Snapshot::Query(snapshot) = snapshot {
                on_next(snapshot);
            }
        });

        self.subscribe(collection.into(), callback, None)
    }

    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Stops listening to other contexts and drops every listener.
    ///
    /// Document operations keep working on the persisted data; new listeners are refused
    /// with [`LocalStoreError::ShutDown`].
    pub async fn shutdown(self) -> LocalStoreResult<()> {
        self.inner.closed.store(true, Ordering::Release);

        let subscription = self
            .inner
            .bus_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }

        self.inner.listeners.clear();
        debug!("shut down local store on key {}", self.inner.config.storage_key);

        Ok(())
    }

    fn id_strategy(&self) -> IdStrategy {
        self.inner.config.id_strategy
    }

    fn subscribe(
        &self,
        reference: Reference,
        callback: SnapshotCallback,
        on_error: Option<ErrorCallback>,
    ) -> Subscription {
        if self.inner.closed.load(Ordering::Acquire) {
            let err = LocalStoreError::ShutDown;
            match on_error {
                Some(on_error) => on_error(&err),
                None => warn!("listener on {reference} was not registered: {err}"),
            }
            return Subscription::detached();
        }

        let subscription = self
            .inner
            .listeners
            .register(reference.clone(), callback.clone());

        let db = self.inner.load();
        callback(&snapshot_of(&db, &reference));

        subscription
    }
}

impl StoreInner {
    /// Loads the persisted database. Any failure yields an empty database.
    fn load(&self) -> Database {
        let key = &self.config.storage_key;

        match self.storage.get_item(key) {
            Ok(Some(raw)) if raw.is_empty() => Database::new(),
            Ok(Some(raw)) => Database::from_json(&raw).unwrap_or_else(|err| {
                warn!("failed to parse local store database {key}: {err}");
                Database::new()
            }),
            Ok(None) => Database::new(),
            Err(StorageError::Unavailable(reason)) => {
                debug!("storage unavailable, reading {key} as empty: {reason}");
                Database::new()
            }
            Err(err) => {
                warn!("failed to read local store database {key}: {err}");
                Database::new()
            }
        }
    }

    /// Persists the database and announces it to other contexts. Failures are logged and
    /// otherwise ignored.
    fn persist(&self, db: &Database) {
        let key = &self.config.storage_key;

        let raw = match db.to_json() {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to serialize local store database {key}: {err}");
                return;
            }
        };

        match self.storage.set_item(key, &raw) {
            Ok(()) => self
                .bus
                .publish(StorageEvent::new(key.clone(), Some(raw))),
            Err(StorageError::Unavailable(reason)) => {
                debug!("storage unavailable, dropping write to {key}: {reason}");
            }
            Err(err) => warn!("failed to persist local store database {key}: {err}"),
        }
    }

    fn notify(&self, reference: &Reference, db: &Database) {
        let callbacks = self.listeners.callbacks_for(reference);
        if callbacks.is_empty() {
            return;
        }

        let snapshot = snapshot_of(db, reference);
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Notifies listeners on a written document and on its collection.
    fn notify_write(&self, reference: &DocumentReference) {
        let db = self.load();

        self.notify(&Reference::Collection(reference.parent()), &db);
        self.notify(&Reference::from(reference), &db);
    }

    /// Reloads the database and notifies every listener.
    fn refresh_all(&self) {
        let db = self.load();

        for (reference, callbacks) in self.listeners.all() {
            let snapshot = snapshot_of(&db, &reference);
            for callback in callbacks {
                callback(&snapshot);
            }
        }
    }

    fn handle_external_change(&self, event: &StorageEvent) {
        if event.key != self.config.storage_key {
            trace!("ignoring change to unrelated key {}", event.key);
            return;
        }
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        debug!(
            "database {} changed in another context, refreshing {} listeners",
            event.key,
            self.listeners.len()
        );
        self.refresh_all();
    }
}

impl fmt::Debug for StoreInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreInner")
            .field("config", &self.config)
            .field("storage", &self.storage)
            .field("bus", &self.bus)
            .field("listeners", &self.listeners)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

fn document_snapshot(db: &Database, reference: &DocumentReference) -> DocumentSnapshot {
    DocumentSnapshot::new(
        reference.clone(),
        db.document(reference.collection_path(), reference.id())
            .cloned(),
    )
}

fn query_snapshot(db: &Database, reference: &CollectionReference) -> QuerySnapshot {
    QuerySnapshot::new(reference.clone(), db.collection(reference.path()))
}

fn snapshot_of(db: &Database, reference: &Reference) -> Snapshot {
    match reference {
        Reference::Collection(reference) => Snapshot::Query(query_snapshot(db, reference)),
        Reference::Document(reference) => Snapshot::Document(document_snapshot(db, reference)),
    }
}

/// Factory trait for stores that need asynchronous setup.
#[async_trait]
pub trait StoreBuilder {
    type Store;

    async fn build(self) -> LocalStoreResult<Self::Store>;
}

/// Builder for [`LocalStore`].
///
/// A storage is required. Without a bus the store only reacts to its own writes.
///
/// # Example
///
/// ```ignore
/// use localdoc_core::{config::IdStrategy, store::{LocalStore, StoreBuilder}};
///
/// let store = LocalStore::builder()
///     .with_storage(storage)
///     .with_storage_key("tontine.db")
///     .with_id_strategy(IdStrategy::Uuid)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct LocalStoreBuilder {
    config: StoreConfig,
    storage: Option<Arc<dyn KeyValueStorage>>,
    bus: Option<Arc<dyn ChangeBus>>,
}

impl LocalStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage_key = key.into();
        self
    }

    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.config.id_strategy = strategy;
        self
    }

    pub fn with_storage<S: KeyValueStorage + 'static>(mut self, storage: S) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    pub fn with_bus<B: ChangeBus + 'static>(mut self, bus: B) -> Self {
        self.bus = Some(Arc::new(bus));
        self
    }
}

#[async_trait]
impl StoreBuilder for LocalStoreBuilder {
    type Store = LocalStore;

    async fn build(self) -> LocalStoreResult<Self::Store> {
        let storage = self.storage.ok_or_else(|| {
            LocalStoreError::Initialization("no key-value storage configured".to_string())
        })?;
        let bus = self.bus.unwrap_or_else(|| {
            debug!("no change bus configured, listeners will only see local writes");
            Arc::new(DetachedBus)
        });

        LocalStore::new(self.config, storage, bus)
    }
}
