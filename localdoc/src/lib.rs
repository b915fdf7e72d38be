//! Main localdoc crate: a local stand-in for a cloud document database.
//!
//! This crate is the entry point for users of localdoc. It re-exports the core types and
//! gives access to the storage substrates a [`LocalStore`](store::LocalStore) can run on.
//!
//! # Features
//!
//! - **Document operations** - Add, set (with merge), update, delete and read documents
//! - **Live snapshots** - Listeners fire immediately and after every relevant change
//! - **Cross-context sync** - Stores sharing a storage refresh each other's listeners
//! - **Graceful degradation** - Without storage, reads are empty and writes are dropped
//! - **File persistence** - Enable the `file` feature to keep data on disk
//!
//! # Quick Start
//!
//! ```ignore
//! use localdoc::{prelude::*, memory::MemoryStorage};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = MemoryStorage::new();
//!     let store = storage.open_store().await.unwrap();
//!
//!     let members = collection("members");
//!     let subscription = store.on_collection_snapshot(&members, |snapshot| {
//!         println!("{} members", snapshot.len());
//!     });
//!
//!     let awa = store
//!         .add_doc(&members, to_fields(&json!({ "name": "Awa" })).unwrap())
//!         .await
//!         .unwrap();
//!
//!     store
//!         .set_doc(&awa, to_fields(&json!({ "shares": 2 })).unwrap(), SetOptions::merge())
//!         .await
//!         .unwrap();
//!
//!     let snapshot = store.get_doc(&awa).await.unwrap();
//!     println!("{:?}", snapshot.data());
//!
//!     subscription.unsubscribe();
//!     store.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Queries
//!
//! Filtered queries are not supported. [`query::query`] and [`query::where_`] exist so
//! that calling code keeps its shape, but both always return
//! [`LocalStoreError::Unsupported`](error::LocalStoreError::Unsupported).

pub mod prelude;

pub use localdoc_core::{
    config, document, error, listener, query, reference, snapshot, storage, store,
};

pub use serde_json;

/// In-memory storage shared between simulated execution contexts.
pub mod memory {
    pub use localdoc_memory::{MemoryContext, MemoryStorage, UnavailableStorage};
}

/// Storage keeping one file per key on disk.
///
/// This module is only available when the `file` feature is enabled.
#[cfg(feature = "file")]
pub mod file {
    pub use localdoc_file::FileStorage;
}
