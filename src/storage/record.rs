//! Adapter over an asynchronous transactional record store
//!
//! Layout: one database, one collection (`"state"` by default), records keyed
//! by storage key with the wire text as value. Opening is idempotent and
//! creates the collection on first use. Connections are not pooled: each
//! adapter call opens one, runs a single-record transaction, and the
//! connection closes when that transaction completes.

use std::rc::Rc;

use async_trait::async_trait;

use super::{OnFault, StorageAdapter};
use crate::config::RecordSchema;
use crate::error::BackendFault;

/// Transaction scope for a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// One single-record operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOp {
    Get { key: String },
    Put { key: String, value: String },
    Delete { key: String },
}

impl RecordOp {
    pub fn mode(&self) -> TransactionMode {
        match self {
            RecordOp::Get { .. } => TransactionMode::ReadOnly,
            RecordOp::Put { .. } | RecordOp::Delete { .. } => TransactionMode::ReadWrite,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            RecordOp::Get { key } | RecordOp::Put { key, .. } | RecordOp::Delete { key } => key,
        }
    }
}

/// Opens connections to a record database
#[async_trait(?Send)]
pub trait RecordStore {
    /// Open (creating or upgrading as needed) the database described by `schema`
    async fn open(&self, schema: &RecordSchema) -> Result<Box<dyn RecordConnection>, BackendFault>;
}

/// A single-use connection
#[async_trait(?Send)]
pub trait RecordConnection {
    /// Run `op` in its own transaction against the schema's collection.
    ///
    /// `Get` yields the stored value; writes yield `None`. The connection is
    /// closed once the transaction completes, whether or not it succeeded.
    async fn run(&self, op: RecordOp) -> Result<Option<String>, BackendFault>;
}

/// IndexedDB-style adapter
pub struct TransactionalAdapter {
    store: Rc<dyn RecordStore>,
    schema: RecordSchema,
    on_fault: OnFault,
}

impl TransactionalAdapter {
    pub fn new(store: Rc<dyn RecordStore>, schema: RecordSchema, on_fault: OnFault) -> Self {
        Self {
            store,
            schema,
            on_fault,
        }
    }

    async fn execute(&self, op: RecordOp) -> Result<Option<String>, BackendFault> {
        let connection = self.store.open(&self.schema).await?;
        connection.run(op).await
    }
}

#[async_trait(?Send)]
impl StorageAdapter for TransactionalAdapter {
    async fn get(&self, name: &str) -> Result<Option<String>, BackendFault> {
        let outcome = self
            .execute(RecordOp::Get {
                key: name.to_string(),
            })
            .await;
        self.on_fault.read(self.label(), outcome)
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), BackendFault> {
        let outcome = self
            .execute(RecordOp::Put {
                key: name.to_string(),
                value: value.to_string(),
            })
            .await
            .map(drop);
        self.on_fault.write(self.label(), "setting", outcome)
    }

    async fn remove(&self, name: &str) -> Result<(), BackendFault> {
        let outcome = self
            .execute(RecordOp::Delete {
                key: name.to_string(),
            })
            .await
            .map(drop);
        self.on_fault.write(self.label(), "removing", outcome)
    }

    fn label(&self) -> &str {
        "IndexedDB"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRecordStore;
    use futures::FutureExt;
    use futures::executor::{LocalPool, block_on};
    use futures::task::LocalSpawnExt;

    fn adapter(store: &MemoryRecordStore, on_fault: OnFault) -> TransactionalAdapter {
        TransactionalAdapter::new(Rc::new(store.clone()), RecordSchema::default(), on_fault)
    }

    #[test]
    fn test_op_modes() {
        assert_eq!(
            RecordOp::Get { key: "k".into() }.mode(),
            TransactionMode::ReadOnly
        );
        assert_eq!(
            RecordOp::Delete { key: "k".into() }.mode(),
            TransactionMode::ReadWrite
        );
    }

    #[test]
    fn test_get_unwritten_key_is_none() {
        let store = MemoryRecordStore::new();
        assert_eq!(block_on(adapter(&store, OnFault::FailSoft).get("nope")), Ok(None));
    }

    #[test]
    fn test_first_open_creates_collection() {
        let store = MemoryRecordStore::new();
        let adapter = adapter(&store, OnFault::FailSoft);
        block_on(adapter.set("todo-storage-indexedDB", "{}")).unwrap();

        assert_eq!(store.version("todoPersistStore"), Some(1));
        assert!(store.has_collection("todoPersistStore", "state"));
        assert_eq!(
            store.record("todoPersistStore", "state", "todo-storage-indexedDB"),
            Some("{}".to_string())
        );
    }

    #[test]
    fn test_connection_per_operation() {
        let store = MemoryRecordStore::new();
        let adapter = adapter(&store, OnFault::FailSoft);
        block_on(async {
            adapter.set("k", "v").await.unwrap();
            adapter.get("k").await.unwrap();
            adapter.remove("k").await.unwrap();
        });
        assert_eq!(store.opens(), 3);
        assert_eq!(store.open_connections(), 0);
        assert_eq!(
            store.modes(),
            vec![
                TransactionMode::ReadWrite,
                TransactionMode::ReadOnly,
                TransactionMode::ReadWrite
            ]
        );
    }

    #[test]
    fn test_suspends_until_transaction_completes() {
        let store = MemoryRecordStore::new();
        store.hold(true);
        let adapter = adapter(&store, OnFault::FailSoft);

        let mut pending = Box::pin(adapter.set("k", "v"));
        assert!((&mut pending).now_or_never().is_none());
        assert_eq!(store.record("todoPersistStore", "state", "k"), None);

        store.release(0);
        assert_eq!(block_on(pending), Ok(()));
        assert_eq!(store.record("todoPersistStore", "state", "k"), Some("v".to_string()));
    }

    #[test]
    fn test_open_failure_is_soft() {
        let store = MemoryRecordStore::new();
        store.fail_open(true);
        let adapter = adapter(&store, OnFault::FailSoft);
        assert_eq!(block_on(adapter.get("k")), Ok(None));
        assert_eq!(block_on(adapter.set("k", "v")), Ok(()));
        assert_eq!(block_on(adapter.remove("k")), Ok(()));
    }

    #[test]
    fn test_open_failure_propagates_when_asked() {
        let store = MemoryRecordStore::new();
        store.fail_open(true);
        let adapter = adapter(&store, OnFault::Propagate);
        assert!(matches!(
            block_on(adapter.get("k")),
            Err(BackendFault::Connection(_))
        ));
    }

    #[test]
    fn test_transaction_fault_follows_policy() {
        let store = MemoryRecordStore::new();
        block_on(adapter(&store, OnFault::FailSoft).set("k", "v")).unwrap();
        store.fail_transactions(true);

        let soft = adapter(&store, OnFault::FailSoft);
        assert_eq!(block_on(soft.get("k")), Ok(None));
        assert_eq!(block_on(soft.set("k", "w")), Ok(()));
        assert_eq!(block_on(soft.remove("k")), Ok(()));

        let strict = adapter(&store, OnFault::Propagate);
        assert!(matches!(
            block_on(strict.get("k")),
            Err(BackendFault::Transaction(_))
        ));
        assert!(matches!(
            block_on(strict.set("k", "w")),
            Err(BackendFault::Transaction(_))
        ));
        assert_eq!(store.open_connections(), 0);
        assert_eq!(store.record("todoPersistStore", "state", "k").as_deref(), Some("v"));
    }

    /// Issue set("k","A") then set("k","B") without awaiting, completing them
    /// in the given order, and return what ends up stored.
    fn overlapping_sets(completion_order: [usize; 2]) -> Option<String> {
        let store = MemoryRecordStore::new();
        store.hold(true);
        let adapter = Rc::new(adapter(&store, OnFault::FailSoft));

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for value in ["A", "B"] {
            let adapter = adapter.clone();
            spawner
                .spawn_local(async move {
                    adapter.set("k", value).await.unwrap();
                })
                .unwrap();
            pool.run_until_stalled();
        }
        assert_eq!(store.parked(), 2);

        for index in completion_order {
            store.release(index);
            pool.run_until_stalled();
        }
        store.record("todoPersistStore", "state", "k")
    }

    #[test]
    fn test_overlapping_sets_last_completion_wins() {
        assert_eq!(overlapping_sets([0, 1]).as_deref(), Some("B"));
        // The later set does not win when the earlier one completes last
        assert_eq!(overlapping_sets([1, 0]).as_deref(), Some("A"));
    }
}
