//! Storage kind selection

use serde::{Deserialize, Serialize};

/// Which backend a todo list is persisted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StorageKind {
    /// Origin-scoped synchronous store (`localStorage`)
    #[default]
    #[serde(rename = "localStorage")]
    Persistent,
    /// Tab-scoped synchronous store (`sessionStorage`)
    #[serde(rename = "sessionStorage")]
    SessionScoped,
    /// Asynchronous transactional record store (IndexedDB)
    #[serde(rename = "indexedDB")]
    Transactional,
}

impl StorageKind {
    pub const ALL: [StorageKind; 3] = [
        StorageKind::Persistent,
        StorageKind::SessionScoped,
        StorageKind::Transactional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Persistent => "localStorage",
            StorageKind::SessionScoped => "sessionStorage",
            StorageKind::Transactional => "indexedDB",
        }
    }

    /// Exact match on the stored tag
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Parse a tag, warning and falling back to `Persistent` when unknown
    pub fn from_str_or_default(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            log::warn!("Unknown storage type: {s}, falling back to localStorage");
            StorageKind::Persistent
        })
    }

    /// Namespaced record key, distinct per kind
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.as_str())
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in StorageKind::ALL {
            assert_eq!(StorageKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(StorageKind::from_str("LOCALSTORAGE"), None);
    }

    #[test]
    fn test_unknown_tag_falls_back() {
        assert_eq!(StorageKind::from_str_or_default("cookies"), StorageKind::Persistent);
        assert_eq!(
            StorageKind::from_str_or_default("indexedDB"),
            StorageKind::Transactional
        );
    }

    #[test]
    fn test_storage_keys_distinct() {
        let keys: Vec<_> = StorageKind::ALL
            .iter()
            .map(|k| k.storage_key("todo-storage"))
            .collect();
        assert_eq!(
            keys,
            vec![
                "todo-storage-localStorage",
                "todo-storage-sessionStorage",
                "todo-storage-indexedDB"
            ]
        );
    }
}
