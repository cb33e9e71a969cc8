//! JavaScript surface for the UI layer (WASM only)
//!
//! Exposes the todo store as a `TodoStoreHandle` class:
//! `items`, `add`, `remove`, `clear`, `storageKind`, `setStorageKind`.

use std::rc::Rc;

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::binding::TodoStore;
use crate::config::PersistConfig;
use crate::state::id_from_f64;
use crate::storage::{AdapterFactory, StorageKind};

/// Spawns onto the browser microtask queue
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

fn to_js(err: impl std::error::Error) -> JsValue {
    JsError::new(&err.to_string()).into()
}

#[wasm_bindgen]
pub struct TodoStoreHandle {
    inner: Rc<TodoStore>,
}

#[wasm_bindgen]
impl TodoStoreHandle {
    /// Resolve to a hydrated store. `config` may be `undefined`.
    pub fn open(config: JsValue) -> Promise {
        future_to_promise(async move {
            let config: PersistConfig = if config.is_undefined() || config.is_null() {
                PersistConfig::default()
            } else {
                serde_wasm_bindgen::from_value(config)?
            };
            let factory = AdapterFactory::browser(config);
            let store = TodoStore::open(factory, Rc::new(BrowserSpawner))
                .await
                .map_err(to_js)?;
            Ok(TodoStoreHandle {
                inner: Rc::new(store),
            }
            .into())
        })
    }

    /// `[[id, text], ...]` in render order
    pub fn items(&self) -> Result<JsValue, JsValue> {
        let items: Vec<(f64, String)> = self
            .inner
            .items()
            .into_iter()
            .map(|(id, text)| (id as f64, text))
            .collect();
        Ok(serde_wasm_bindgen::to_value(&items)?)
    }

    /// New id, or `undefined` if the store is not ready
    pub fn add(&self, text: String) -> Option<f64> {
        self.inner.add(text).map(|id| id as f64)
    }

    /// Removed text; `undefined` for ids that are not non-negative integers
    pub fn remove(&self, id: f64) -> Option<String> {
        let Some(id) = id_from_f64(id) else {
            log::warn!("Ignoring invalid todo id {id}");
            return None;
        };
        self.inner.remove(id)
    }

    pub fn clear(&self) -> Promise {
        let store = self.inner.clone();
        future_to_promise(async move {
            store.clear().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(getter, js_name = storageKind)]
    pub fn storage_kind(&self) -> String {
        self.inner.storage_kind().as_str().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String {
        format!("{:?}", self.inner.phase())
    }

    /// Switch backend; unknown names fall back to localStorage
    #[wasm_bindgen(js_name = setStorageKind)]
    pub fn set_storage_kind(&self, kind: String) -> Promise {
        let store = self.inner.clone();
        future_to_promise(async move {
            let kind = StorageKind::from_str_or_default(&kind);
            store.set_storage_kind(kind).await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }
}
