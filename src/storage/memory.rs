//! In-memory substrates
//!
//! Used on native builds and in tests. Both stores are cheap `Rc` handles, so
//! a test can keep a clone to inspect contents and inject faults while an
//! adapter owns another.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;

use super::key_value::KeyValueStore;
use super::record::{RecordConnection, RecordOp, RecordStore, TransactionMode};
use crate::config::RecordSchema;
use crate::error::BackendFault;

#[derive(Default)]
struct KeyValueInner {
    items: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Synchronous string store standing in for `localStorage`/`sessionStorage`
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<KeyValueInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail as if storage were disabled
    pub fn fail_reads(&self, fail: bool) {
        self.inner.borrow_mut().fail_reads = fail;
    }

    /// Make every write and remove fail as if quota were exhausted
    pub fn fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Current value, bypassing fault injection
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.inner.borrow().items.get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendFault> {
        let inner = self.inner.borrow();
        if inner.fail_reads {
            return Err(BackendFault::Unavailable("storage disabled".to_string()));
        }
        Ok(inner.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendFault> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(BackendFault::QuotaExceeded(format!("cannot store {key}")));
        }
        inner.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendFault> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(BackendFault::QuotaExceeded(format!("cannot remove {key}")));
        }
        inner.items.remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryDatabase {
    version: u32,
    collections: HashMap<String, HashMap<String, String>>,
}

#[derive(Default)]
struct RecordInner {
    databases: HashMap<String, MemoryDatabase>,
    opens: usize,
    open_connections: usize,
    modes: Vec<TransactionMode>,
    fail_open: bool,
    fail_transactions: bool,
    holding: bool,
    parked: Vec<Option<oneshot::Sender<()>>>,
}

/// Asynchronous record store standing in for IndexedDB
///
/// With [`hold`](Self::hold) enabled every transaction parks before touching
/// data until the test releases it, which makes completion order scriptable.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Rc<RefCell<RecordInner>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self, fail: bool) {
        self.inner.borrow_mut().fail_open = fail;
    }

    pub fn fail_transactions(&self, fail: bool) {
        self.inner.borrow_mut().fail_transactions = fail;
    }

    /// Park transactions until released
    pub fn hold(&self, hold: bool) {
        self.inner.borrow_mut().holding = hold;
    }

    /// Number of transactions parked so far (released ones included)
    pub fn parked(&self) -> usize {
        self.inner.borrow().parked.len()
    }

    /// Let the `index`-th parked transaction complete
    pub fn release(&self, index: usize) {
        let sender = self
            .inner
            .borrow_mut()
            .parked
            .get_mut(index)
            .and_then(Option::take);
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    /// Total connections ever opened
    pub fn opens(&self) -> usize {
        self.inner.borrow().opens
    }

    /// Connections opened and not yet closed
    pub fn open_connections(&self) -> usize {
        self.inner.borrow().open_connections
    }

    /// Transaction modes in the order transactions started
    pub fn modes(&self) -> Vec<TransactionMode> {
        self.inner.borrow().modes.clone()
    }

    pub fn version(&self, database: &str) -> Option<u32> {
        self.inner.borrow().databases.get(database).map(|db| db.version)
    }

    pub fn has_collection(&self, database: &str, collection: &str) -> bool {
        self.inner
            .borrow()
            .databases
            .get(database)
            .is_some_and(|db| db.collections.contains_key(collection))
    }

    /// Stored record, bypassing connections
    pub fn record(&self, database: &str, collection: &str, key: &str) -> Option<String> {
        self.inner
            .borrow()
            .databases
            .get(database)?
            .collections
            .get(collection)?
            .get(key)
            .cloned()
    }
}

#[async_trait(?Send)]
impl RecordStore for MemoryRecordStore {
    async fn open(&self, schema: &RecordSchema) -> Result<Box<dyn RecordConnection>, BackendFault> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_open {
            return Err(BackendFault::Connection(format!(
                "cannot open {}",
                schema.database
            )));
        }

        let db = inner.databases.entry(schema.database.clone()).or_default();
        if schema.version < db.version {
            return Err(BackendFault::Connection(format!(
                "{} is at version {}, requested {}",
                schema.database, db.version, schema.version
            )));
        }
        if schema.version > db.version {
            // Upgrade path: create the collection on first use
            db.collections.entry(schema.collection.clone()).or_default();
            db.version = schema.version;
        }

        inner.opens += 1;
        inner.open_connections += 1;
        Ok(Box::new(MemoryConnection {
            inner: self.inner.clone(),
            schema: schema.clone(),
            closed: Cell::new(false),
        }))
    }
}

struct MemoryConnection {
    inner: Rc<RefCell<RecordInner>>,
    schema: RecordSchema,
    closed: Cell<bool>,
}

impl MemoryConnection {
    fn apply(&self, op: RecordOp) -> Result<Option<String>, BackendFault> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_transactions {
            return Err(BackendFault::Transaction(format!(
                "transaction on {} aborted",
                op.key()
            )));
        }
        let collection = inner
            .databases
            .get_mut(&self.schema.database)
            .and_then(|db| db.collections.get_mut(&self.schema.collection))
            .ok_or_else(|| {
                BackendFault::Transaction(format!(
                    "no collection {} in {}",
                    self.schema.collection, self.schema.database
                ))
            })?;

        Ok(match op {
            RecordOp::Get { key } => collection.get(&key).cloned(),
            RecordOp::Put { key, value } => {
                collection.insert(key, value);
                None
            }
            RecordOp::Delete { key } => {
                collection.remove(&key);
                None
            }
        })
    }

    fn close(&self) {
        if !self.closed.replace(true) {
            self.inner.borrow_mut().open_connections -= 1;
        }
    }
}

#[async_trait(?Send)]
impl RecordConnection for MemoryConnection {
    async fn run(&self, op: RecordOp) -> Result<Option<String>, BackendFault> {
        if self.closed.get() {
            return Err(BackendFault::Transaction("connection is closed".to_string()));
        }

        let gate = {
            let mut inner = self.inner.borrow_mut();
            inner.modes.push(op.mode());
            if inner.holding {
                let (tx, rx) = oneshot::channel();
                inner.parked.push(Some(tx));
                Some(rx)
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            // A dropped sender just means the store went away; finish anyway
            let _ = gate.await;
        }

        let outcome = self.apply(op);
        self.close();
        outcome
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}
