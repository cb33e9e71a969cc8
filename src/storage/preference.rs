//! Bootstrap setting: which storage kind the user last picked
//!
//! Always read and written through the persistent adapter, independent of
//! whichever backend currently holds the todo list.

use super::{AdapterHandle, StorageKind};
use crate::error::BackendFault;

/// Single-entry store for the preferred [`StorageKind`]
pub struct PreferenceStore {
    adapter: AdapterHandle,
    key: String,
}

impl PreferenceStore {
    pub fn new(adapter: AdapterHandle, key: impl Into<String>) -> Self {
        Self {
            adapter,
            key: key.into(),
        }
    }

    /// Stored preference; `Persistent` when unset or unrecognized
    pub async fn load(&self) -> Result<StorageKind, BackendFault> {
        Ok(match self.adapter.get(&self.key).await? {
            Some(tag) => StorageKind::from_str_or_default(&tag),
            None => StorageKind::default(),
        })
    }

    pub async fn save(&self, kind: StorageKind) -> Result<(), BackendFault> {
        self.adapter.set(&self.key, kind.as_str()).await
    }
}
