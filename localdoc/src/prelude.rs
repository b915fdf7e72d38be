//! Convenient re-exports of commonly used types from localdoc.
//!
//! ```ignore
//! use localdoc::prelude::*;
//! ```

pub use localdoc_core::{
    config::{IdStrategy, StoreConfig},
    document::{Database, Fields, from_fields, to_fields},
    error::{LocalStoreError, LocalStoreResult},
    listener::Subscription,
    query::{query, where_},
    reference::{CollectionReference, DocumentReference, Reference, collection, doc},
    snapshot::{DocumentSnapshot, QueryDocumentSnapshot, QuerySnapshot, Snapshot},
    storage::{ChangeBus, KeyValueStorage, StorageError, StorageEvent},
    store::{LocalStore, LocalStoreBuilder, SetOptions, StoreBuilder},
};
