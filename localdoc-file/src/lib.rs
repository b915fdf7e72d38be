//! File-backed storage substrate for localdoc.
//!
//! [`FileStorage`] keeps each key in its own file under a root directory, which lets a
//! store outlive the process that wrote it.
//!
//! # Quick Start
//!
//! ```ignore
//! use localdoc_file::FileStorage;
//!
//! let storage = FileStorage::new("/var/lib/tontine");
//! let store = storage.open_store().await?;
//!
//! store.add_doc(&store.collection("members"), fields).await?;
//!
//! // Later, possibly in another process.
//! let reopened = FileStorage::new("/var/lib/tontine").open_store().await?;
//! assert_eq!(reopened.get_docs(&reopened.collection("members")).await?.len(), 1);
//! ```

pub mod storage;

pub use storage::FileStorage;
