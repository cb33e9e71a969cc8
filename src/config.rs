//! Persistence configuration
//!
//! Every field has a default matching what the web app has always written,
//! so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::storage::OnFault;

/// Record database layout for the transactional backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSchema {
    /// Database name
    pub database: String,
    /// Schema version; raising it runs the upgrade path
    pub version: u32,
    /// The single collection holding state records
    pub collection: String,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            database: "todoPersistStore".to_string(),
            version: 1,
            collection: "state".to_string(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Prefix of per-kind record keys (`<prefix>-<kind>`)
    pub key_prefix: String,
    /// Bootstrap key holding the preferred storage kind
    pub preference_key: String,
    /// Transactional backend layout
    pub records: RecordSchema,
    /// What adapters do with backend faults
    pub on_fault: OnFault,
    /// Discard out-of-order write completions per key
    pub sequenced_writes: bool,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            key_prefix: "todo-storage".to_string(),
            preference_key: "preferred-storage-type".to_string(),
            records: RecordSchema::default(),
            on_fault: OnFault::FailSoft,
            sequenced_writes: false,
        }
    }
}

impl PersistConfig {
    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = PersistConfig::from_json("{}").unwrap();
        assert_eq!(config, PersistConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config =
            PersistConfig::from_json(r#"{"on_fault":"Propagate","records":{"version":2}}"#)
                .unwrap();
        assert_eq!(config.on_fault, OnFault::Propagate);
        assert_eq!(config.records.version, 2);
        assert_eq!(config.records.collection, "state");
        assert_eq!(config.key_prefix, "todo-storage");
    }
}
