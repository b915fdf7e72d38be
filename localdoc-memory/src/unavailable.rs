//! Storage for environments without any persistent substrate.

use localdoc_core::storage::{KeyValueStorage, StorageError, StorageResult};

/// A [`KeyValueStorage`] that fails every access with [`StorageError::Unavailable`].
///
/// A store built on it reads every collection as empty and silently drops writes, which
/// keeps callers working when no storage exists (e.g. server-side rendering).
#[derive(Debug, Clone, Default)]
pub struct UnavailableStorage {
    reason: String,
}

impl UnavailableStorage {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StorageError {
        StorageError::Unavailable(self.reason.clone())
    }
}

impl KeyValueStorage for UnavailableStorage {
    fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(self.error())
    }

    fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(self.error())
    }

    fn remove_item(&self, _key: &str) -> StorageResult<()> {
        Err(self.error())
    }
}
