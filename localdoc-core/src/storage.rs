//! The persistence substrate the store sits on.
//!
//! The store needs two collaborators from its environment:
//!
//! - [`KeyValueStorage`]: a synchronous get/set store of string blobs, keyed by string.
//! - [`ChangeBus`]: a broadcast channel that tells *other* execution contexts sharing the
//!   same storage that a key changed. A writer never receives its own events.
//!
//! Without a real bus (see [`DetachedBus`]) the store still notifies listeners for its own
//! writes, it just never hears about writes made elsewhere.

use std::{fmt, sync::Arc};

use thiserror::Error;

/// Failure reported by a [`KeyValueStorage`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// There is no usable storage in the current environment.
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    /// The storage exists but reading or writing it failed.
    #[error("storage I/O failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous string key-value storage.
///
/// A write must replace the value atomically as seen by later reads.
pub trait KeyValueStorage: Send + Sync + fmt::Debug {
    /// Returns the last value written under `key`, or `None` if there is none.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replaces the value under `key`.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

impl<S> KeyValueStorage for Arc<S>
where
    S: KeyValueStorage + ?Sized,
{
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }
}

/// Notification that a key changed in the shared storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// The new value, or `None` if the key was removed.
    pub new_value: Option<String>,
}

impl StorageEvent {
    pub fn new(key: impl Into<String>, new_value: Option<String>) -> Self {
        Self {
            key: key.into(),
            new_value,
        }
    }
}

/// Callback invoked for every event received from another context.
pub type ChangeHandler = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Cross-context change notifications.
pub trait ChangeBus: Send + Sync + fmt::Debug {
    /// Announces a change to every other context. The publisher's own handlers are skipped.
    fn publish(&self, event: StorageEvent);

    /// Registers `handler` for changes published by other contexts.
    fn subscribe(&self, handler: ChangeHandler) -> BusSubscription;
}

impl<B> ChangeBus for Arc<B>
where
    B: ChangeBus + ?Sized,
{
    fn publish(&self, event: StorageEvent) {
        (**self).publish(event)
    }

    fn subscribe(&self, handler: ChangeHandler) -> BusSubscription {
        (**self).subscribe(handler)
    }
}

/// Handle to a [`ChangeBus`] registration.
///
/// The registration is cancelled by [`cancel`](BusSubscription::cancel) or when the handle
/// is dropped.
pub struct BusSubscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl BusSubscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle that is not attached to anything.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for BusSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusSubscription")
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}

/// A bus that connects to nothing: publishing is a no-op and nothing is ever received.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedBus;

impl ChangeBus for DetachedBus {
    fn publish(&self, _event: StorageEvent) {}

    fn subscribe(&self, _handler: ChangeHandler) -> BusSubscription {
        BusSubscription::detached()
    }
}
