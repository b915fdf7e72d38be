//! Live snapshot listeners.
//!
//! Listeners are kept in an explicit registry keyed by path, one table for collection
//! listeners and one for document listeners. Every registration gets its own id, so the
//! same callback registered twice yields two independent subscriptions.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    error::LocalStoreError,
    reference::Reference,
    snapshot::Snapshot,
};

/// Callback receiving every snapshot delivered to a listener.
pub type SnapshotCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Callback receiving the error when a listener's initial snapshot cannot be produced.
pub type ErrorCallback = Arc<dyn Fn(&LocalStoreError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerKind {
    Collection,
    Document,
}

impl ListenerKind {
    fn of(reference: &Reference) -> Self {
        match reference {
            Reference::Collection(_) => ListenerKind::Collection,
            Reference::Document(_) => ListenerKind::Document,
        }
    }
}

struct Listener {
    id: u64,
    callback: SnapshotCallback,
}

struct PathListeners {
    reference: Reference,
    listeners: Vec<Listener>,
}

type ListenerTable = BTreeMap<String, PathListeners>;

/// All listeners registered on one store.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    collections: RwLock<ListenerTable>,
    documents: RwLock<ListenerTable>,
}

impl ListenerRegistry {
    fn table(&self, kind: ListenerKind) -> &RwLock<ListenerTable> {
        match kind {
            ListenerKind::Collection => &self.collections,
            ListenerKind::Document => &self.documents,
        }
    }

    fn read(&self, kind: ListenerKind) -> RwLockReadGuard<'_, ListenerTable> {
        self.table(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, kind: ListenerKind) -> RwLockWriteGuard<'_, ListenerTable> {
        self.table(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(
        self: &Arc<Self>,
        reference: Reference,
        callback: SnapshotCallback,
    ) -> Subscription {
        let kind = ListenerKind::of(&reference);
        let path = reference.path().to_string();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.write(kind)
            .entry(path.clone())
            .or_insert_with(|| PathListeners {
                reference,
                listeners: Vec::new(),
            })
            .listeners
            .push(Listener { id, callback });

        Subscription {
            registry: Arc::downgrade(self),
            key: Some((kind, path, id)),
        }
    }

    fn remove(&self, kind: ListenerKind, path: &str, id: u64) -> bool {
        let mut table = self.write(kind);
        let Some(entry) = table.get_mut(path) else {
            return false;
        };

        let before = entry.listeners.len();
        entry.listeners.retain(|listener| listener.id != id);
        let removed = entry.listeners.len() != before;

        if entry.listeners.is_empty() {
            table.remove(path);
        }

        removed
    }

    fn contains(&self, kind: ListenerKind, path: &str, id: u64) -> bool {
        self.read(kind)
            .get(path)
            .is_some_and(|entry| entry.listeners.iter().any(|listener| listener.id == id))
    }

    /// Callbacks registered on `reference`'s path, in registration order.
    pub(crate) fn callbacks_for(&self, reference: &Reference) -> Vec<SnapshotCallback> {
        self.read(ListenerKind::of(reference))
            .get(reference.path())
            .map(|entry| {
                entry
                    .listeners
                    .iter()
                    .map(|listener| listener.callback.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every watched reference with its callbacks: collections first, then documents.
    pub(crate) fn all(&self) -> Vec<(Reference, Vec<SnapshotCallback>)> {
        [ListenerKind::Collection, ListenerKind::Document]
            .into_iter()
            .flat_map(|kind| {
                self.read(kind)
                    .values()
                    .map(|entry| {
                        (
                            entry.reference.clone(),
                            entry
                                .listeners
                                .iter()
                                .map(|listener| listener.callback.clone())
                                .collect(),
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        [ListenerKind::Collection, ListenerKind::Document]
            .into_iter()
            .map(|kind| {
                self.read(kind)
                    .values()
                    .map(|entry| entry.listeners.len())
                    .sum::<usize>()
            })
            .sum()
    }

    pub(crate) fn clear(&self) {
        self.write(ListenerKind::Collection).clear();
        self.write(ListenerKind::Document).clear();
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("collections", &self.read(ListenerKind::Collection).len())
            .field("documents", &self.read(ListenerKind::Document).len())
            .finish()
    }
}

/// Handle to a live listener.
///
/// Dropping the handle does not stop delivery; call [`unsubscribe`](Subscription::unsubscribe).
#[must_use = "the listener stays registered until `unsubscribe` is called"]
#[derive(Debug, Clone)]
pub struct Subscription {
    registry: Weak<ListenerRegistry>,
    key: Option<(ListenerKind, String, u64)>,
}

impl Subscription {
    /// A subscription that was never registered.
    pub(crate) fn detached() -> Self {
        Self {
            registry: Weak::new(),
            key: None,
        }
    }

    /// Stops delivery to this listener. Calling it again has no effect.
    pub fn unsubscribe(&self) {
        if let (Some(registry), Some((kind, path, id))) = (self.registry.upgrade(), &self.key) {
            registry.remove(*kind, path, *id);
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        match (self.registry.upgrade(), &self.key) {
            (Some(registry), Some((kind, path, id))) => registry.contains(*kind, path, *id),
            _ => false,
        }
    }
}
