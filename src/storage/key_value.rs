//! Adapter over synchronous string-keyed stores

use std::rc::Rc;

use async_trait::async_trait;

use super::{OnFault, StorageAdapter};
use crate::error::BackendFault;

/// A synchronous string store such as `localStorage` or `sessionStorage`
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendFault>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendFault>;
    fn remove_item(&self, key: &str) -> Result<(), BackendFault>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendFault> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendFault> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendFault> {
        (**self).remove_item(key)
    }
}

/// Pass-through adapter; every future is ready on first poll
pub struct KeyValueAdapter<S> {
    store: S,
    label: &'static str,
    on_fault: OnFault,
}

impl<S: KeyValueStore> KeyValueAdapter<S> {
    pub fn new(store: S, label: &'static str, on_fault: OnFault) -> Self {
        Self {
            store,
            label,
            on_fault,
        }
    }
}

#[async_trait(?Send)]
impl<S: KeyValueStore> StorageAdapter for KeyValueAdapter<S> {
    async fn get(&self, name: &str) -> Result<Option<String>, BackendFault> {
        self.on_fault.read(self.label, self.store.get_item(name))
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), BackendFault> {
        self.on_fault
            .write(self.label, "setting", self.store.set_item(name, value))
    }

    async fn remove(&self, name: &str) -> Result<(), BackendFault> {
        self.on_fault
            .write(self.label, "removing", self.store.remove_item(name))
    }

    fn label(&self) -> &str {
        self.label
    }
}
