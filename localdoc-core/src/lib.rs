//! A local JSON document store that emulates a cloud document database on top of a
//! key-value substrate.
//!
//! This crate is the core of the localdoc project and provides:
//!
//! - **Documents** ([`document`]) - Field maps and the persisted database model
//! - **References** ([`reference`]) - Pure locators for collections and documents
//! - **Snapshots** ([`snapshot`]) - Point-in-time read results
//! - **Storage substrate** ([`storage`]) - Traits for the key-value store and the change bus
//! - **Listeners** ([`listener`]) - Live snapshot subscriptions
//! - **Local store** ([`store`]) - The adapter tying everything together
//! - **Configuration** ([`config`]) - Storage key and id generation settings
//! - **Queries** ([`query`]) - Filtered query entry points, which always fail
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use localdoc_core::{store::LocalStore, store::SetOptions};
//! use serde_json::json;
//!
//! let store = LocalStore::builder()
//!     .with_storage(storage)
//!     .with_bus(bus)
//!     .build()
//!     .await?;
//!
//! let members = store.collection("members");
//! let alice = store.add_doc(&members, to_fields(&json!({ "name": "Alice" }))?).await?;
//!
//! let subscription = store.on_doc_snapshot(&alice, |snapshot| {
//!     println!("alice is now {:?}", snapshot.data());
//! });
//!
//! store.set_doc(&alice, to_fields(&json!({ "paid": true }))?, SetOptions::merge()).await?;
//! subscription.unsubscribe();
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod listener;
pub mod query;
pub mod reference;
pub mod snapshot;
pub mod storage;
pub mod store;
