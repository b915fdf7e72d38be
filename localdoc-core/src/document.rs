//! Document fields and the persisted database model.
//!
//! A document is a map of field names to JSON values ([`Fields`]). Documents live in
//! collections keyed by id, and collections live in a [`Database`] keyed by path. The
//! whole database is what gets serialized into the storage substrate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::{LocalStoreError, LocalStoreResult};

/// The fields of a single document.
pub type Fields = Map<String, Value>;

/// The documents of a single collection, keyed by document id.
pub type CollectionMap = BTreeMap<String, Fields>;

/// Every collection known to the store, keyed by collection path.
///
/// This is the unit of persistence: reads load the whole database and writes store the
/// whole database back. Its JSON form is a plain nested object
/// `{ "<collection>": { "<id>": { "<field>": <value> } } }` with no version tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    collections: BTreeMap<String, CollectionMap>,
}

impl Database {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a database from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Serialization`] if the blob is not a valid database.
    pub fn from_json(raw: &str) -> LocalStoreResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serializes the database into its persisted JSON form.
    pub fn to_json(&self) -> LocalStoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Returns the paths of every collection, in key order.
    pub fn collection_paths(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Returns the documents of a collection, if the collection exists.
    pub fn collection(&self, path: &str) -> Option<&CollectionMap> {
        self.collections.get(path)
    }

    /// Returns the fields of a document, if it exists.
    pub fn document(&self, collection: &str, id: &str) -> Option<&Fields> {
        self.collections
            .get(collection)
            .and_then(|documents| documents.get(id))
    }

    /// Returns a collection for mutation, creating it when missing.
    pub fn ensure_collection(&mut self, path: &str) -> &mut CollectionMap {
        self.collections
            .entry(path.to_string())
            .or_default()
    }

    /// Stores `fields` under `id`, replacing whatever was there.
    pub fn put(&mut self, collection: &str, id: &str, fields: Fields) {
        self.ensure_collection(collection)
            .insert(id.to_string(), fields);
    }

    /// Shallowly merges `fields` into the document at `id`.
    ///
    /// Returns `false` without touching the database when the document does not exist.
    pub fn merge(&mut self, collection: &str, id: &str, fields: Fields) -> bool {
        match self
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        {
            Some(existing) => {
                merge_fields(existing, fields);
                true
            }
            None => false,
        }
    }

    /// Removes the document at `id`, returning its fields if it existed.
    pub fn remove(&mut self, collection: &str, id: &str) -> Option<Fields> {
        self.collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
    }
}

/// Copies every top-level entry of `fields` into `target`.
///
/// Nested objects are replaced wholesale, never merged recursively.
pub fn merge_fields(target: &mut Fields, fields: Fields) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

/// Converts any serializable value into document fields.
///
/// # Errors
///
/// Returns [`LocalStoreError::InvalidDocument`] if the value does not serialize to a JSON
/// object, or [`LocalStoreError::Serialization`] if serialization itself fails.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> LocalStoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(LocalStoreError::InvalidDocument(format!(
            "expected an object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Deserializes document fields into a typed value.
pub fn from_fields<T: DeserializeOwned>(fields: &Fields) -> LocalStoreResult<T> {
    Ok(serde_json::from_value(Value::Object(fields.clone()))?)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut db = Database::new();
        db.put("members", "a", fields(json!({ "a": 1, "b": 2, "nested": { "x": 1, "y": 2 } })));

        assert!(db.merge("members", "a", fields(json!({ "b": 3, "c": 4, "nested": { "x": 9 } }))));

        assert_eq!(
            db.document("members", "a"),
            Some(&fields(json!({ "a": 1, "b": 3, "nested": { "x": 9 }, "c": 4 })))
        );
    }

    #[test]
    fn test_merge_missing_document() {
        let mut db = Database::new();
        assert!(!db.merge("members", "ghost", fields(json!({ "a": 1 }))));
        assert!(db.is_empty());
    }

    #[test]
    fn test_put_replaces() {
        let mut db = Database::new();
        db.put("members", "a", fields(json!({ "a": 1, "b": 2 })));
        db.put("members", "a", fields(json!({ "b": 3, "c": 4 })));

        assert_eq!(db.document("members", "a"), Some(&fields(json!({ "b": 3, "c": 4 }))));
    }

    #[test]
    fn test_remove_absent() {
        let mut db = Database::new();
        assert_eq!(db.remove("members", "a"), None);

        db.ensure_collection("members");
        assert_eq!(db.remove("members", "a"), None);
        assert!(db.collection("members").unwrap().is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let mut db = Database::new();
        db.put(
            "projets",
            "p1",
            fields(json!({
                "title": "Caisse",
                "amount": 1250.5,
                "members": ["a", "b"],
                "meta": { "archived": false, "note": null }
            })),
        );
        db.ensure_collection("empty");

        let raw = db.to_json().unwrap();
        assert_eq!(Database::from_json(&raw).unwrap(), db);
    }

    #[test]
    fn test_persisted_shape() {
        let mut db = Database::new();
        db.put("members", "m1", fields(json!({ "name": "Awa" })));

        let value: Value = serde_json::from_str(&db.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "members": { "m1": { "name": "Awa" } } }));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Database::from_json("{not json"),
            Err(LocalStoreError::Serialization(_))
        ));
        assert!(Database::from_json("null").is_err());
    }

    #[test]
    fn test_to_fields_requires_object() {
        #[derive(Serialize)]
        struct Member {
            name: &'static str,
            shares: u32,
        }

        let member = to_fields(&Member { name: "Awa", shares: 3 }).unwrap();
        assert_eq!(member, fields(json!({ "name": "Awa", "shares": 3 })));

        assert!(matches!(to_fields(&42), Err(LocalStoreError::InvalidDocument(_))));
        assert!(matches!(to_fields(&vec![1, 2]), Err(LocalStoreError::InvalidDocument(_))));
    }

    #[test]
    fn test_from_fields() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Loan {
            amount: f64,
            repaid: bool,
        }

        let loan: Loan = from_fields(&fields(json!({ "amount": 300.0, "repaid": false }))).unwrap();
        assert_eq!(loan, Loan { amount: 300.0, repaid: false });

        let bad: LocalStoreResult<Loan> = from_fields(&fields(json!({ "amount": "lots" })));
        assert!(matches!(bad, Err(LocalStoreError::Serialization(_))));
    }
}
