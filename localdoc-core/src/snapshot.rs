//! Point-in-time read results.
//!
//! Snapshots are values: they never change after being produced. Observing a newer state
//! requires a new read or a live listener.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    document::{CollectionMap, Fields, from_fields},
    error::LocalStoreResult,
    reference::{CollectionReference, DocumentReference},
};

/// The state of a single document at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    reference: DocumentReference,
    data: Option<Fields>,
}

impl DocumentSnapshot {
    pub(crate) fn new(reference: DocumentReference, data: Option<Fields>) -> Self {
        Self { reference, data }
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    /// Whether a document was stored at the reference when the snapshot was taken.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// The document's fields, or `None` if it does not exist.
    pub fn data(&self) -> Option<&Fields> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Fields> {
        self.data
    }

    /// Returns a single top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|data| data.get(field))
    }

    /// Deserializes the document into `T`. Returns `Ok(None)` if it does not exist.
    pub fn data_as<T: DeserializeOwned>(&self) -> LocalStoreResult<Option<T>> {
        self.data
            .as_ref()
            .map(from_fields)
            .transpose()
    }
}

/// One document inside a [`QuerySnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocumentSnapshot {
    id: String,
    data: Fields,
}

impl QueryDocumentSnapshot {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &Fields {
        &self.data
    }

    pub fn into_data(self) -> Fields {
        self.data
    }

    pub fn data_as<T: DeserializeOwned>(&self) -> LocalStoreResult<T> {
        from_fields(&self.data)
    }
}

/// Every document of a collection at read time, ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    reference: CollectionReference,
    docs: Vec<QueryDocumentSnapshot>,
}

impl QuerySnapshot {
    pub(crate) fn new(reference: CollectionReference, documents: Option<&CollectionMap>) -> Self {
        let docs = documents
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, data)| QueryDocumentSnapshot {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { reference, docs }
    }

    pub fn reference(&self) -> &CollectionReference {
        &self.reference
    }

    pub fn docs(&self) -> &[QueryDocumentSnapshot] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryDocumentSnapshot> {
        self.docs.iter()
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = QueryDocumentSnapshot;
    type IntoIter = std::vec::IntoIter<QueryDocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

impl<'a> IntoIterator for &'a QuerySnapshot {
    type Item = &'a QueryDocumentSnapshot;
    type IntoIter = std::slice::Iter<'a, QueryDocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}

/// A snapshot delivered to a live listener.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Document(DocumentSnapshot),
    Query(QuerySnapshot),
}

impl Snapshot {
    pub fn as_document(&self) -> Option<&DocumentSnapshot> {
        match self {
            Snapshot::Document(snapshot) => Some(snapshot),
            Snapshot::Query(_) => None,
        }
    }

    pub fn as_query(&self) -> Option<&QuerySnapshot> {
        match self {
            Snapshot::Query(snapshot) => Some(snapshot),
            Snapshot::Document(_) => None,
        }
    }
}
