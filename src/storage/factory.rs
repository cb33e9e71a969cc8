//! Adapter factory
//!
//! Holds the three substrates and hands out an adapter per [`StorageKind`].
//! Every adapter it builds shares the configured fault policy.

use std::rc::Rc;

use super::{
    AdapterHandle, KeyValueAdapter, KeyValueStore, MemoryRecordStore, MemoryStore,
    PreferenceStore, RecordStore, SequencedAdapter, StorageKind, TransactionalAdapter,
};
use crate::config::PersistConfig;

/// Builds adapters over a fixed set of substrates
pub struct AdapterFactory {
    local: Rc<dyn KeyValueStore>,
    session: Rc<dyn KeyValueStore>,
    records: Rc<dyn RecordStore>,
    config: PersistConfig,
}

impl AdapterFactory {
    pub fn new(
        local: Rc<dyn KeyValueStore>,
        session: Rc<dyn KeyValueStore>,
        records: Rc<dyn RecordStore>,
        config: PersistConfig,
    ) -> Self {
        Self {
            local,
            session,
            records,
            config,
        }
    }

    /// Fresh in-memory substrates (native builds, tests)
    pub fn in_memory(config: PersistConfig) -> Self {
        Self::new(
            Rc::new(MemoryStore::new()),
            Rc::new(MemoryStore::new()),
            Rc::new(MemoryRecordStore::new()),
            config,
        )
    }

    /// The browser's `localStorage`, `sessionStorage` and IndexedDB
    #[cfg(target_arch = "wasm32")]
    pub fn browser(config: PersistConfig) -> Self {
        use super::web::{BrowserStorage, IndexedDbStore, StorageScope};
        Self::new(
            Rc::new(BrowserStorage::new(StorageScope::Local)),
            Rc::new(BrowserStorage::new(StorageScope::Session)),
            Rc::new(IndexedDbStore::new()),
            config,
        )
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    /// Adapter for `kind`
    pub fn create(&self, kind: StorageKind) -> AdapterHandle {
        let on_fault = self.config.on_fault;
        let adapter: AdapterHandle = match kind {
            StorageKind::Persistent => Rc::new(KeyValueAdapter::new(
                self.local.clone(),
                "localStorage",
                on_fault,
            )),
            StorageKind::SessionScoped => Rc::new(KeyValueAdapter::new(
                self.session.clone(),
                "sessionStorage",
                on_fault,
            )),
            StorageKind::Transactional => Rc::new(TransactionalAdapter::new(
                self.records.clone(),
                self.config.records.clone(),
                on_fault,
            )),
        };

        if self.config.sequenced_writes {
            Rc::new(SequencedAdapter::new(adapter))
        } else {
            adapter
        }
    }

    /// Adapter for a kind given by tag; unknown tags fall back to `Persistent`
    pub fn create_named(&self, tag: &str) -> AdapterHandle {
        self.create(StorageKind::from_str_or_default(tag))
    }

    /// Preference store, always on the persistent backend and never sequenced
    pub fn preferences(&self) -> PreferenceStore {
        let adapter = KeyValueAdapter::new(self.local.clone(), "localStorage", self.config.on_fault);
        PreferenceStore::new(Rc::new(adapter), self.config.preference_key.clone())
    }
}
