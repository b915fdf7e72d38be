//! Collection and document references.
//!
//! References are pure locators: building one performs no I/O and says nothing about
//! whether the data exists. A document's path is always `<collection path>/<id>`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{config::IdStrategy, error::LocalStoreError};

/// Locates a collection by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionReference {
    path: String,
}

impl CollectionReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns a reference to the document `id` inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentReference {
        DocumentReference::new(&self.path, id)
    }
}

/// Locates exactly one document by its full path.
///
/// The id is the last path segment and the collection path is everything before it, so
/// an id containing `/` moves the document into a nested collection: `doc("a", Some("b/c"))`
/// and `doc("a/b", Some("c"))` are the same reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DocumentReference {
    path: String,
    split: usize,
}

impl DocumentReference {
    pub fn new(collection_path: &str, id: impl Into<String>) -> Self {
        let path = format!("{collection_path}/{}", id.into());
        let split = path.rfind('/').unwrap_or_default();

        Self { path, split }
    }

    /// Full path of the document, `<collection path>/<id>`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last segment of the path.
    pub fn id(&self) -> &str {
        &self.path[self.split + 1..]
    }

    /// Path of the owning collection.
    pub fn collection_path(&self) -> &str {
        &self.path[..self.split]
    }

    pub fn parent(&self) -> CollectionReference {
        CollectionReference::new(self.collection_path())
    }
}

impl From<DocumentReference> for String {
    fn from(reference: DocumentReference) -> Self {
        reference.path
    }
}

impl TryFrom<String> for DocumentReference {
    type Error = LocalStoreError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        match path.rfind('/') {
            Some(split) => Ok(Self { path, split }),
            None => Err(LocalStoreError::InvalidDocument(format!(
                "document path {path} has no collection"
            ))),
        }
    }
}

/// Either kind of reference, used where both are accepted (e.g. live listeners).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    Collection(CollectionReference),
    Document(DocumentReference),
}

impl Reference {
    pub fn path(&self) -> &str {
        match self {
            Reference::Collection(reference) => reference.path(),
            Reference::Document(reference) => reference.path(),
        }
    }
}

impl From<CollectionReference> for Reference {
    fn from(reference: CollectionReference) -> Self {
        Reference::Collection(reference)
    }
}

impl From<DocumentReference> for Reference {
    fn from(reference: DocumentReference) -> Self {
        Reference::Document(reference)
    }
}

impl From<&CollectionReference> for Reference {
    fn from(reference: &CollectionReference) -> Self {
        Reference::Collection(reference.clone())
    }
}

impl From<&DocumentReference> for Reference {
    fn from(reference: &DocumentReference) -> Self {
        Reference::Document(reference.clone())
    }
}

impl fmt::Display for CollectionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Builds a collection reference. Any path is accepted.
pub fn collection(path: impl Into<String>) -> CollectionReference {
    CollectionReference::new(path)
}

/// Builds a document reference, synthesizing an id when none (or an empty one) is given.
pub fn doc(collection_path: &str, id: Option<&str>) -> DocumentReference {
    doc_with(collection_path, id, IdStrategy::default())
}

pub(crate) fn doc_with(
    collection_path: &str,
    id: Option<&str>,
    strategy: IdStrategy,
) -> DocumentReference {
    match id {
        Some(id) if !id.is_empty() => DocumentReference::new(collection_path, id),
        _ => DocumentReference::new(collection_path, strategy.generate()),
    }
}
