//! Error types and result types for local store operations.
//!
//! Most failures inside the store are recovered (an unreadable database is treated as
//! empty, an unavailable storage turns writes into no-ops). The variants below are the
//! ones that can still reach a caller. Use [`LocalStoreResult<T>`] as the return type
//! for fallible operations.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::storage::StorageError;

/// Represents all errors that can be surfaced by the local store.
#[derive(Error, Debug)]
pub enum LocalStoreError {
    /// Serialization/deserialization error when converting between fields and typed values.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The store could not be constructed from the supplied configuration.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The document at the given path does not exist.
    #[error("Document {0} does not exist")]
    NotFound(String),
    /// The operation is part of the document database surface but is not implemented locally.
    #[error("{0} is not implemented for the local store")]
    Unsupported(&'static str),
    /// A value could not be used as a document's fields.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The store has been shut down and no longer accepts listeners.
    #[error("The local store has been shut down")]
    ShutDown,
    /// An error reported by the key-value substrate.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A specialized `Result` type for local store operations.
pub type LocalStoreResult<T> = Result<T, LocalStoreError>;

impl From<SerdeJsonError> for LocalStoreError {
    fn from(err: SerdeJsonError) -> Self {
        LocalStoreError::Serialization(err.to_string())
    }
}
