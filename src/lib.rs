//! Todo Persist - pluggable browser persistence for a todo list
//!
//! Core modules:
//! - `codec`: JSON wire format with tagged ordered maps
//! - `storage`: get/set/remove adapters over localStorage, sessionStorage
//!   and IndexedDB, plus the factory that picks one
//! - `binding`: the todo store that hydrates from and writes to an adapter
//! - `config`: key names, record database layout, fault policy

pub mod binding;
pub mod codec;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
#[cfg(target_arch = "wasm32")]
pub mod js;

pub use binding::{Phase, TodoStore};
pub use codec::{OrderedMap, decode, encode};
pub use config::PersistConfig;
pub use error::{BackendFault, DecodeError, EncodeError, PersistError};
pub use state::{TodoId, TodoState};
pub use storage::{AdapterFactory, OnFault, StorageAdapter, StorageKind};
