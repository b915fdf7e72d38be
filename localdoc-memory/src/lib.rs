//! In-memory storage substrate for localdoc.
//!
//! This crate provides a [`MemoryStorage`] that plays the role of a browser's local
//! storage shared by several tabs. Each [`MemoryContext`] is one such tab: it reads and
//! writes the shared items and publishes change events that every *other* context
//! receives.
//!
//! # Features
//!
//! - **Shared items** - All contexts see the same key-value pairs
//! - **Cross-context events** - Publishing skips the publisher, like browser storage events
//! - **External edits** - [`MemoryStorage::dispatch`] simulates a change made outside any store
//! - **Degraded environments** - [`UnavailableStorage`] fails every access
//!
//! # Quick Start
//!
//! ```ignore
//! use localdoc_memory::MemoryStorage;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = MemoryStorage::new();
//!
//!     // Two "tabs" over the same storage.
//!     let first = storage.open_store().await.unwrap();
//!     let second = storage.open_store().await.unwrap();
//!
//!     let members = second.collection("members");
//!     let _subscription = second.on_collection_snapshot(&members, |snapshot| {
//!         println!("{} members", snapshot.len());
//!     });
//!
//!     // Prints "1 members" through the second store's listener.
//!     first.add_doc(&members, Default::default()).await.unwrap();
//! }
//! ```

pub mod storage;
pub mod unavailable;

pub use storage::{MemoryContext, MemoryStorage};
pub use unavailable::UnavailableStorage;
