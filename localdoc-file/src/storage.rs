use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use uuid::Uuid;

use localdoc_core::{
    config::StoreConfig,
    error::LocalStoreResult,
    storage::{KeyValueStorage, StorageResult},
    store::{LocalStore, StoreBuilder},
};

const ITEM_EXT: &str = ".kv";

/// A [`KeyValueStorage`] keeping one file per key under a root directory.
///
/// Writes go to a temporary file that is then renamed over the item, so a reader never
/// observes a half-written blob. The root directory is created on the first write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn item_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{ITEM_EXT}", sanitize(key)))
    }

    /// Builds a [`LocalStore`] over this directory with the default config.
    ///
    /// The store has no change bus: it sees its own writes, not those of other processes.
    pub async fn open_store(&self) -> LocalStoreResult<LocalStore> {
        self.open_store_with(StoreConfig::default()).await
    }

    pub async fn open_store_with(&self, config: StoreConfig) -> LocalStoreResult<LocalStore> {
        LocalStore::builder()
            .with_config(config)
            .with_storage(self.clone())
            .build()
            .await
    }

    fn ensure_root(&self) -> StorageResult<()> {
        if !self.root.exists() {
            debug!("creating storage directory {}", self.root.display());
            fs::create_dir_all(&self.root)?;
        }

        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.item_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.ensure_root()?;

        let target = self.item_path(key);
        let tmp = self
            .root
            .join(format!(".{}-{}.tmp", sanitize(key), Uuid::new_v4().simple()));

        fs::write(&tmp, value)?;
        if let Err(err) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }

        trace!("wrote {} bytes to {}", value.len(), target.display());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Maps a key to a file name, one-to-one.
///
/// ASCII alphanumerics, `.` and `-` are kept. Every other byte, `_` included, becomes
/// `_XX` in uppercase hex. A leading dot is escaped too, keeping items apart from temp
/// files and from `.` and `..`.
fn sanitize(key: &str) -> String {
    let mut name = String::with_capacity(key.len());

    for (i, byte) in key.bytes().enumerate() {
        match byte {
            b'.' if i == 0 => name.push_str("_2E"),
            b if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-') => {
                name.push(char::from(b))
            }
            b => name.push_str(&format!("_{b:02X}")),
        }
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("local.firestore.db"), "local.firestore.db");
        assert_eq!(sanitize("../etc/passwd"), "_2E._2Fetc_2Fpasswd");
        assert_eq!(sanitize("a b/c"), "a_20b_2Fc");
        assert_eq!(sanitize("é"), "_C3_A9");
    }

    #[test]
    fn test_sanitize_is_injective() {
        let keys = ["tontine/2025", "tontine_2025", "tontine_2F2025", "tontine 2025"];
        let names: HashSet<String> = keys.iter().map(|key| sanitize(key)).collect();

        assert_eq!(names.len(), keys.len());
    }

    #[test]
    fn test_item_path_stays_in_root() {
        let storage = FileStorage::new("/var/lib/localdoc");
        let path = storage.item_path("../../escape");

        assert_eq!(path.parent(), Some(Path::new("/var/lib/localdoc")));
    }

    #[test]
    fn test_missing_root_reads_as_empty() {
        let storage = FileStorage::new("/nonexistent/localdoc/root");

        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.remove_item("k").unwrap();
    }
}
