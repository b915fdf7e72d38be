//! Filtered queries.
//!
//! The local store has no query engine. [`query`] and [`where_`] exist so that callers
//! written against the document database API get an explicit
//! [`LocalStoreError::Unsupported`] instead of silently unfiltered results.
//! Use [`LocalStore::get_docs`](crate::store::LocalStore::get_docs) and filter in memory.

use log::warn;
use serde_json::Value;

use crate::{
    error::{LocalStoreError, LocalStoreResult},
    reference::CollectionReference,
};

/// A single filter clause. No value of this type can be produced.
#[derive(Debug, Clone)]
pub struct QueryConstraint {
    _private: (),
}

/// A filtered view of a collection. No value of this type can be produced.
#[derive(Debug, Clone)]
pub struct Query {
    _private: (),
}

/// Always fails with [`LocalStoreError::Unsupported`].
pub fn query(
    collection: &CollectionReference,
    _constraints: Vec<QueryConstraint>,
) -> LocalStoreResult<Query> {
    warn!("query on {collection} attempted against the local store");
    Err(LocalStoreError::Unsupported("query"))
}

/// Always fails with [`LocalStoreError::Unsupported`].
pub fn where_(
    field: &str,
    op: &str,
    _value: impl Into<Value>,
) -> LocalStoreResult<QueryConstraint> {
    warn!("where({field} {op} ..) attempted against the local store");
    Err(LocalStoreError::Unsupported("where"))
}
