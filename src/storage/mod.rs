//! Storage adapters
//!
//! Every backend implements [`StorageAdapter`]: get/set/remove over raw
//! wire text. Adapters never see typed state; encoding happens in the binding.
//!
//! - [`KeyValueAdapter`]: synchronous string stores (`localStorage`,
//!   `sessionStorage`). Futures resolve on first poll.
//! - [`TransactionalAdapter`]: asynchronous record store (IndexedDB). One
//!   connection and one single-record transaction per call.
//! - [`SequencedAdapter`]: optional layer discarding stale write completions.

pub mod factory;
pub mod key_value;
pub mod kind;
pub mod memory;
pub mod preference;
pub mod record;
pub mod sequenced;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use factory::AdapterFactory;
pub use key_value::{KeyValueAdapter, KeyValueStore};
pub use kind::StorageKind;
pub use memory::{MemoryRecordStore, MemoryStore};
pub use preference::PreferenceStore;
pub use record::{RecordConnection, RecordOp, RecordStore, TransactionMode, TransactionalAdapter};
pub use sequenced::SequencedAdapter;

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendFault;

/// Uniform get/set/remove contract over one backend
#[async_trait(?Send)]
pub trait StorageAdapter {
    /// Stored text for `name`, or `None` if nothing was written
    async fn get(&self, name: &str) -> Result<Option<String>, BackendFault>;

    async fn set(&self, name: &str, value: &str) -> Result<(), BackendFault>;

    async fn remove(&self, name: &str) -> Result<(), BackendFault>;

    /// Short backend label for logs
    fn label(&self) -> &str;
}

/// Shared handle to the adapter currently in use
pub type AdapterHandle = Rc<dyn StorageAdapter>;

/// What an adapter does when its backend faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OnFault {
    /// Log and carry on: reads yield `None`, writes become no-ops
    #[default]
    FailSoft,
    /// Return the fault to the caller
    Propagate,
}

impl OnFault {
    /// Apply the policy to a read outcome
    pub fn read(
        self,
        label: &str,
        outcome: Result<Option<String>, BackendFault>,
    ) -> Result<Option<String>, BackendFault> {
        match (self, outcome) {
            (_, Ok(value)) => Ok(value),
            (OnFault::FailSoft, Err(fault)) => {
                log::error!("Error getting item from {label}: {fault}");
                Ok(None)
            }
            (OnFault::Propagate, Err(fault)) => Err(fault),
        }
    }

    /// Apply the policy to a write or remove outcome
    pub fn write(
        self,
        label: &str,
        action: &str,
        outcome: Result<(), BackendFault>,
    ) -> Result<(), BackendFault> {
        match (self, outcome) {
            (_, Ok(())) => Ok(()),
            (OnFault::FailSoft, Err(fault)) => {
                log::error!("Error {action} item in {label}: {fault}");
                Ok(())
            }
            (OnFault::Propagate, Err(fault)) => Err(fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_soft_swallows_faults() {
        let fault = BackendFault::Unavailable("disabled".to_string());
        assert_eq!(OnFault::FailSoft.read("test", Err(fault.clone())), Ok(None));
        assert_eq!(OnFault::FailSoft.write("test", "setting", Err(fault)), Ok(()));
    }

    #[test]
    fn test_propagate_returns_faults() {
        let fault = BackendFault::QuotaExceeded("full".to_string());
        assert_eq!(
            OnFault::Propagate.write("test", "setting", Err(fault.clone())),
            Err(fault)
        );
    }
}
