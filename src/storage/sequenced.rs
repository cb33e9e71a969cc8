//! Per-key write sequencing
//!
//! Plain adapters let overlapping writes complete in any order, so the last
//! write to *complete* wins even when it was issued first. This layer numbers
//! every `set` and `remove` per key. When a completion arrives that is older
//! than one already applied, the stale write has just overwritten newer data
//! and the newest issued write (value or removal) is applied again. Nothing
//! waits on earlier writes.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;

use super::{AdapterHandle, StorageAdapter};
use crate::error::BackendFault;

#[derive(Default)]
struct KeyLedger {
    /// Highest sequence number handed out
    issued: u64,
    /// Highest sequence number known to have landed
    applied: u64,
    /// Write carried by `issued`; `None` is a removal
    latest: Option<String>,
}

/// Adapter wrapper that discards stale write completions
pub struct SequencedAdapter {
    inner: AdapterHandle,
    ledger: RefCell<HashMap<String, KeyLedger>>,
}

impl SequencedAdapter {
    pub fn new(inner: AdapterHandle) -> Self {
        Self {
            inner,
            ledger: RefCell::new(HashMap::new()),
        }
    }

    fn issue(&self, name: &str, value: Option<&str>) -> u64 {
        let mut ledger = self.ledger.borrow_mut();
        let entry = ledger.entry(name.to_string()).or_default();
        entry.issued += 1;
        entry.latest = value.map(str::to_string);
        entry.issued
    }

    /// Record a completion. Returns the write to re-apply if it was stale.
    fn settle(&self, name: &str, seq: u64) -> Option<(u64, Option<String>)> {
        let mut ledger = self.ledger.borrow_mut();
        let entry = ledger.get_mut(name)?;
        if seq >= entry.applied {
            entry.applied = seq;
            None
        } else {
            log::debug!(
                "Discarding stale write #{seq} to {name} (#{} already applied)",
                entry.applied
            );
            Some((entry.issued, entry.latest.clone()))
        }
    }

    async fn write(&self, name: &str, value: Option<&str>) -> Result<(), BackendFault> {
        let mut seq = self.issue(name, value);
        let mut value = value.map(str::to_string);
        loop {
            match &value {
                Some(text) => self.inner.set(name, text).await?,
                None => self.inner.remove(name).await?,
            }
            match self.settle(name, seq) {
                None => return Ok(()),
                Some((newest, newest_value)) => {
                    seq = newest;
                    value = newest_value;
                }
            }
        }
    }
}

#[async_trait(?Send)]
impl StorageAdapter for SequencedAdapter {
    async fn get(&self, name: &str) -> Result<Option<String>, BackendFault> {
        self.inner.get(name).await
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), BackendFault> {
        self.write(name, Some(value)).await
    }

    async fn remove(&self, name: &str) -> Result<(), BackendFault> {
        self.write(name, None).await
    }

    fn label(&self) -> &str {
        self.inner.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordSchema;
    use crate::storage::{MemoryRecordStore, OnFault, TransactionalAdapter};
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use std::rc::Rc;

    fn sequenced(store: &MemoryRecordStore) -> Rc<SequencedAdapter> {
        let inner = TransactionalAdapter::new(
            Rc::new(store.clone()),
            RecordSchema::default(),
            OnFault::FailSoft,
        );
        Rc::new(SequencedAdapter::new(Rc::new(inner)))
    }

    fn spawn_set(pool: &mut LocalPool, adapter: &Rc<SequencedAdapter>, value: &'static str) {
        let adapter = adapter.clone();
        pool.spawner()
            .spawn_local(async move {
                adapter.set("k", value).await.unwrap();
            })
            .unwrap();
        pool.run_until_stalled();
    }

    fn spawn_remove(pool: &mut LocalPool, adapter: &Rc<SequencedAdapter>) {
        let adapter = adapter.clone();
        pool.spawner()
            .spawn_local(async move {
                adapter.remove("k").await.unwrap();
            })
            .unwrap();
        pool.run_until_stalled();
    }

    fn stored(store: &MemoryRecordStore) -> Option<String> {
        store.record("todoPersistStore", "state", "k")
    }

    #[test]
    fn test_in_order_completion_unchanged() {
        let store = MemoryRecordStore::new();
        store.hold(true);
        let adapter = sequenced(&store);
        let mut pool = LocalPool::new();

        spawn_set(&mut pool, &adapter, "A");
        spawn_set(&mut pool, &adapter, "B");
        store.release(0);
        pool.run_until_stalled();
        store.release(1);
        pool.run_until_stalled();

        assert_eq!(stored(&store).as_deref(), Some("B"));
        assert_eq!(store.parked(), 2);
    }

    #[test]
    fn test_stale_completion_is_repaired() {
        let store = MemoryRecordStore::new();
        store.hold(true);
        let adapter = sequenced(&store);
        let mut pool = LocalPool::new();

        spawn_set(&mut pool, &adapter, "A");
        spawn_set(&mut pool, &adapter, "B");

        // B lands first, then the stale A overwrites it
        store.release(1);
        pool.run_until_stalled();
        store.release(0);
        pool.run_until_stalled();
        assert_eq!(stored(&store).as_deref(), Some("A"));

        // The repair write re-applies B
        assert_eq!(store.parked(), 3);
        store.release(2);
        pool.run_until_stalled();
        assert_eq!(stored(&store).as_deref(), Some("B"));
    }

    #[test]
    fn test_stale_set_after_remove_is_removed_again() {
        let store = MemoryRecordStore::new();
        store.hold(true);
        let adapter = sequenced(&store);
        let mut pool = LocalPool::new();

        spawn_set(&mut pool, &adapter, "A");
        spawn_set(&mut pool, &adapter, "B");
        spawn_remove(&mut pool, &adapter);

        store.release(1);
        pool.run_until_stalled();
        store.release(2);
        pool.run_until_stalled();
        assert_eq!(stored(&store), None);

        // The stale A resurrects the record until the removal is repeated
        store.release(0);
        pool.run_until_stalled();
        assert_eq!(stored(&store).as_deref(), Some("A"));
        assert_eq!(store.parked(), 4);
        store.release(3);
        pool.run_until_stalled();
        assert_eq!(stored(&store), None);
    }

    #[test]
    fn test_keys_sequenced_independently() {
        let store = MemoryRecordStore::new();
        let adapter = sequenced(&store);
        futures::executor::block_on(async {
            adapter.set("a", "1").await.unwrap();
            adapter.set("b", "2").await.unwrap();
            adapter.set("a", "3").await.unwrap();
        });
        assert_eq!(store.record("todoPersistStore", "state", "a").as_deref(), Some("3"));
        assert_eq!(store.record("todoPersistStore", "state", "b").as_deref(), Some("2"));
    }
}
