//! Store configuration.
//!
//! [`StoreConfig`] is plain serde data so it can be embedded in an application's own
//! configuration file. Every field has a default matching the layout existing dashboards
//! already persist.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key under which the whole database is persisted by default.
pub const DEFAULT_STORAGE_KEY: &str = "local.firestore.db";

/// How the store synthesizes ids for documents created without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// `<epoch-millis>-<random-hex>`. Collisions within one millisecond are possible
    /// but unlikely.
    #[default]
    Timestamp,
    /// A random v4 UUID in simple (hyphen-less) form.
    Uuid,
}

impl IdStrategy {
    /// Generates a fresh document id.
    pub fn generate(&self) -> String {
        match self {
            IdStrategy::Timestamp => {
                let suffix = Uuid::new_v4().simple().to_string();
                format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..12])
            }
            IdStrategy::Uuid => Uuid::new_v4().simple().to_string(),
        }
    }
}

/// Configuration for a [`LocalStore`](crate::store::LocalStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key of the persisted database blob in the key-value substrate.
    pub storage_key: String,
    /// Id generation strategy for `add_doc` and id-less `doc`.
    pub id_strategy: IdStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            id_strategy: IdStrategy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_timestamp_id_shape() {
        let id = IdStrategy::Timestamp.generate();
        let (millis, suffix) = id.split_once('-').unwrap();

        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_are_distinct() {
        let ids: HashSet<String> = (0..500)
            .map(|_| IdStrategy::Timestamp.generate())
            .collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_uuid_id_shape() {
        let id = IdStrategy::Uuid.generate();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: StoreConfig = serde_json::from_str(r#"{ "id_strategy": "uuid" }"#).unwrap();

        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.id_strategy, IdStrategy::Uuid);
        assert_eq!(serde_json::from_str::<StoreConfig>("{}").unwrap(), StoreConfig::default());
    }
}
