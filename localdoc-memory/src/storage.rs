//! Shared in-memory key-value storage with per-context change events.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use log::trace;

use localdoc_core::{
    config::StoreConfig,
    error::LocalStoreResult,
    storage::{
        BusSubscription, ChangeBus, ChangeHandler, KeyValueStorage, StorageError, StorageEvent,
        StorageResult,
    },
    store::LocalStore,
};

/// Context id used for events that do not originate from any context.
const EXTERNAL: u64 = 0;

struct Registration {
    id: u64,
    context: u64,
    handler: ChangeHandler,
}

#[derive(Default)]
struct Shared {
    items: RwLock<HashMap<String, String>>,
    handlers: RwLock<Vec<Registration>>,
    next_context: AtomicU64,
    next_handler: AtomicU64,
}

impl Shared {
    fn poisoned() -> StorageError {
        StorageError::Unavailable("memory storage lock poisoned".to_string())
    }

    /// Delivers `event` to every handler not registered by `origin`.
    ///
    /// Handlers are collected first so they may touch the storage or the bus themselves.
    fn dispatch_from(&self, origin: u64, event: &StorageEvent) {
        let targets: Vec<ChangeHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|registration| registration.context != origin)
            .map(|registration| registration.handler.clone())
            .collect();

        trace!(
            "dispatching change to {} from context {origin} to {} handlers",
            event.key,
            targets.len()
        );

        for handler in targets {
            handler(event);
        }
    }

    fn unregister(&self, id: u64) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|registration| registration.id != id);
    }
}

/// Key-value storage shared by any number of [`MemoryContext`]s.
///
/// Cloning a `MemoryStorage` shares the same items and contexts. Used directly as a
/// [`KeyValueStorage`] it reads and writes items without announcing anything, which is
/// how tests play the part of an outside writer.
///
/// # Example
///
/// ```ignore
/// use localdoc_memory::MemoryStorage;
/// use localdoc_core::storage::StorageEvent;
///
/// let storage = MemoryStorage::new();
/// let store = storage.open_store().await?;
///
/// // Rewrite the blob behind the store's back, then tell every context about it.
/// storage.set_item("local.firestore.db", r#"{"members":{}}"#)?;
/// storage.dispatch(StorageEvent::new("local.firestore.db", None));
/// ```
#[derive(Clone, Default)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new execution context over this storage.
    pub fn context(&self) -> MemoryContext {
        let id = self.shared.next_context.fetch_add(1, Ordering::Relaxed) + 1;

        MemoryContext {
            id,
            shared: self.shared.clone(),
        }
    }

    /// Opens a new context and builds a [`LocalStore`] over it with the default config.
    pub async fn open_store(&self) -> LocalStoreResult<LocalStore> {
        self.open_store_with(StoreConfig::default()).await
    }

    /// Opens a new context and builds a [`LocalStore`] over it.
    pub async fn open_store_with(&self, config: StoreConfig) -> LocalStoreResult<LocalStore> {
        let context = Arc::new(self.context());

        LocalStore::new(config, context.clone(), context)
    }

    /// Delivers `event` to every context, as if another program had changed the storage.
    pub fn dispatch(&self, event: StorageEvent) {
        self.shared.dispatch_from(EXTERNAL, &event);
    }

    /// Number of handlers currently subscribed across all contexts.
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.shared
            .items
            .read()
            .map(|items| items.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self
            .shared
            .items
            .read()
            .map_err(|_| Shared::poisoned())?;

        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.shared
            .items
            .write()
            .map_err(|_| Shared::poisoned())?
            .insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.shared
            .items
            .write()
            .map_err(|_| Shared::poisoned())?
            .remove(key);

        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("items", &self.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// One execution context over a [`MemoryStorage`], e.g. one simulated browser tab.
///
/// A context is both the [`KeyValueStorage`] and the [`ChangeBus`] of the store running
/// in it. Events it publishes reach every other context but never itself.
#[derive(Clone)]
pub struct MemoryContext {
    id: u64,
    shared: Arc<Shared>,
}

impl MemoryContext {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The storage this context belongs to.
    pub fn storage(&self) -> MemoryStorage {
        MemoryStorage {
            shared: self.shared.clone(),
        }
    }
}

impl KeyValueStorage for MemoryContext {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage().get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage().set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.storage().remove_item(key)
    }
}

impl ChangeBus for MemoryContext {
    fn publish(&self, event: StorageEvent) {
        self.shared.dispatch_from(self.id, &event);
    }

    fn subscribe(&self, handler: ChangeHandler) -> BusSubscription {
        let id = self.shared.next_handler.fetch_add(1, Ordering::Relaxed);

        self.shared
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                id,
                context: self.id,
                handler,
            });

        let shared = Arc::downgrade(&self.shared);
        BusSubscription::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.unregister(id);
            }
        })
    }
}

impl fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryContext")
            .field("id", &self.id)
            .finish()
    }
}
