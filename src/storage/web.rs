//! Browser substrates: Web Storage and IndexedDB (WASM only)

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    DomException, IdbDatabase, IdbObjectStore, IdbOpenDbRequest, IdbRequest, IdbTransaction,
    IdbTransactionMode, Storage,
};

use super::key_value::KeyValueStore;
use super::record::{RecordConnection, RecordOp, RecordStore, TransactionMode};
use crate::config::RecordSchema;
use crate::error::BackendFault;

/// Which Web Storage area to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    Local,
    Session,
}

impl StorageScope {
    fn label(&self) -> &'static str {
        match self {
            StorageScope::Local => "localStorage",
            StorageScope::Session => "sessionStorage",
        }
    }
}

/// Convert a thrown JS value into a fault, recognizing quota errors
fn js_fault(err: JsValue, wrap: fn(String) -> BackendFault) -> BackendFault {
    match err.dyn_ref::<DomException>() {
        Some(ex) if ex.name() == "QuotaExceededError" => BackendFault::QuotaExceeded(ex.message()),
        Some(ex) => wrap(format!("{}: {}", ex.name(), ex.message())),
        None => wrap(format!("{err:?}")),
    }
}

/// `window.localStorage` / `window.sessionStorage`
///
/// The area is looked up on every call; it can be disabled by the user or
/// throw in private browsing modes.
pub struct BrowserStorage {
    scope: StorageScope,
}

impl BrowserStorage {
    pub fn new(scope: StorageScope) -> Self {
        Self { scope }
    }

    fn area(&self) -> Result<Storage, BackendFault> {
        let window = web_sys::window()
            .ok_or_else(|| BackendFault::Unavailable("no window".to_string()))?;
        let area = match self.scope {
            StorageScope::Local => window.local_storage(),
            StorageScope::Session => window.session_storage(),
        };
        area.map_err(|e| js_fault(e, BackendFault::Unavailable))?
            .ok_or_else(|| BackendFault::Unavailable(format!("{} disabled", self.scope.label())))
    }
}

impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendFault> {
        self.area()?
            .get_item(key)
            .map_err(|e| js_fault(e, BackendFault::Unavailable))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendFault> {
        self.area()?
            .set_item(key, value)
            .map_err(|e| js_fault(e, BackendFault::Unavailable))
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendFault> {
        self.area()?
            .remove_item(key)
            .map_err(|e| js_fault(e, BackendFault::Unavailable))
    }
}

/// Wait for an `IDBRequest` to fire `success` or `error`
async fn settle(request: &IdbRequest, wrap: fn(String) -> BackendFault) -> Result<JsValue, BackendFault> {
    let (tx, rx) = oneshot::channel::<Result<JsValue, BackendFault>>();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let on_success = {
        let tx = tx.clone();
        let request = request.clone();
        Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(request.result().map_err(|e| js_fault(e, wrap)));
            }
        })
    };
    let on_error = {
        let tx = tx.clone();
        let request = request.clone();
        Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
            if let Some(tx) = tx.borrow_mut().take() {
                let fault = match request.error() {
                    Ok(Some(ex)) => wrap(format!("{}: {}", ex.name(), ex.message())),
                    Ok(None) => wrap("request failed".to_string()),
                    Err(e) => js_fault(e, wrap),
                };
                let _ = tx.send(Err(fault));
            }
        })
    };

    request.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
    request.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    let outcome = rx
        .await
        .unwrap_or_else(|_| Err(wrap("request dropped".to_string())));

    request.set_onsuccess(None);
    request.set_onerror(None);
    outcome
}

/// IndexedDB via `window.indexedDB`
#[derive(Default)]
pub struct IndexedDbStore;

impl IndexedDbStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl RecordStore for IndexedDbStore {
    async fn open(&self, schema: &RecordSchema) -> Result<Box<dyn RecordConnection>, BackendFault> {
        let factory = web_sys::window()
            .ok_or_else(|| BackendFault::Connection("no window".to_string()))?
            .indexed_db()
            .map_err(|e| js_fault(e, BackendFault::Connection))?
            .ok_or_else(|| BackendFault::Connection("IndexedDB unavailable".to_string()))?;

        let request: IdbOpenDbRequest = factory
            .open_with_u32(&schema.database, schema.version)
            .map_err(|e| js_fault(e, BackendFault::Connection))?;

        // Runs before `success` when the stored version is older
        let on_upgrade = {
            let request = request.clone();
            let collection = schema.collection.clone();
            Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
                let Ok(result) = request.result() else {
                    return;
                };
                let db: IdbDatabase = result.unchecked_into();
                if !db.object_store_names().contains(&collection) {
                    if let Err(e) = db.create_object_store(&collection) {
                        log::error!("Failed to create object store {collection}: {e:?}");
                    }
                }
            })
        };
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let outcome = settle(&request, BackendFault::Connection).await;
        request.set_onupgradeneeded(None);

        let db: IdbDatabase = outcome?.unchecked_into();
        Ok(Box::new(IndexedDbConnection {
            db,
            collection: schema.collection.clone(),
        }))
    }
}

struct IndexedDbConnection {
    db: IdbDatabase,
    collection: String,
}

impl IndexedDbConnection {
    fn begin(&self, mode: TransactionMode) -> Result<(IdbTransaction, IdbObjectStore), BackendFault> {
        let mode = match mode {
            TransactionMode::ReadOnly => IdbTransactionMode::Readonly,
            TransactionMode::ReadWrite => IdbTransactionMode::Readwrite,
        };
        let transaction = self
            .db
            .transaction_with_str_and_mode(&self.collection, mode)
            .map_err(|e| js_fault(e, BackendFault::Transaction))?;
        let store = transaction
            .object_store(&self.collection)
            .map_err(|e| js_fault(e, BackendFault::Transaction))?;
        Ok((transaction, store))
    }

}

type EventHandler = Closure<dyn FnMut(web_sys::Event)>;

/// Resolves when a transaction completes or aborts
///
/// Owns its handlers and unregisters them on drop, so nothing outlives the
/// connection.
struct TransactionWatch {
    transaction: IdbTransaction,
    done: oneshot::Receiver<Result<(), BackendFault>>,
    _handlers: [EventHandler; 3],
}

impl TransactionWatch {
    fn new(transaction: &IdbTransaction) -> Self {
        let (tx, done) = oneshot::channel();
        let tx = Rc::new(RefCell::new(Some(tx)));
        let handler = |outcome: fn(&IdbTransaction) -> Result<(), BackendFault>| {
            let tx = tx.clone();
            let transaction = transaction.clone();
            EventHandler::new(move |_: web_sys::Event| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(outcome(&transaction));
                }
            })
        };
        let handlers = [handler(|_| Ok(())), handler(aborted), handler(aborted)];
        transaction.set_oncomplete(Some(handlers[0].as_ref().unchecked_ref()));
        transaction.set_onabort(Some(handlers[1].as_ref().unchecked_ref()));
        transaction.set_onerror(Some(handlers[2].as_ref().unchecked_ref()));
        Self {
            transaction: transaction.clone(),
            done,
            _handlers: handlers,
        }
    }

    async fn finished(&mut self) -> Result<(), BackendFault> {
        (&mut self.done)
            .await
            .unwrap_or_else(|_| Err(BackendFault::Transaction("transaction dropped".to_string())))
    }
}

fn aborted(transaction: &IdbTransaction) -> Result<(), BackendFault> {
    Err(match transaction.error() {
        Some(ex) => BackendFault::Transaction(format!("{}: {}", ex.name(), ex.message())),
        None => BackendFault::Transaction("transaction aborted".to_string()),
    })
}

impl Drop for TransactionWatch {
    fn drop(&mut self) {
        self.transaction.set_oncomplete(None);
        self.transaction.set_onabort(None);
        self.transaction.set_onerror(None);
    }
}

impl IndexedDbConnection {
    async fn transact(&self, op: &RecordOp) -> Result<Option<String>, BackendFault> {
        let (transaction, store) = self.begin(op.mode())?;
        let mut watch = TransactionWatch::new(&transaction);

        let key = JsValue::from_str(op.key());
        let request = match op {
            RecordOp::Get { .. } => store.get(&key),
            RecordOp::Put { value, .. } => store.put_with_key(&JsValue::from_str(value), &key),
            RecordOp::Delete { .. } => store.delete(&key),
        }
        .map_err(|e| js_fault(e, BackendFault::Transaction))?;

        let result = settle(&request, BackendFault::Transaction).await;
        // A write only counts once its transaction has committed
        watch.finished().await?;
        let result = result?;
        Ok(match op {
            RecordOp::Get { .. } => result.as_string(),
            RecordOp::Put { .. } | RecordOp::Delete { .. } => None,
        })
    }
}

#[async_trait(?Send)]
impl RecordConnection for IndexedDbConnection {
    async fn run(&self, op: RecordOp) -> Result<Option<String>, BackendFault> {
        let outcome = self.transact(&op).await;
        self.db.close();
        outcome
    }
}
