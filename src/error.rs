//! Error types for the persistence layer
//!
//! Two families matter to callers:
//! - [`DecodeError`]: persisted text is corrupt. Always propagated.
//! - [`BackendFault`]: the storage substrate failed (quota, permissions,
//!   connection). Caught at the adapter boundary unless the adapter was
//!   built with [`OnFault::Propagate`](crate::storage::OnFault).

use thiserror::Error;

/// Persisted text is not well-formed wire data
#[derive(Error, Debug)]
#[error("Decode error: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// A value could not be turned into wire text
#[derive(Error, Debug)]
#[error("Encode error: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Failure reported by a storage substrate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendFault {
    /// Storage is disabled or not present in this context
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because the origin ran out of quota
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Opening the record database failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A transaction or request inside an open connection failed
    #[error("Transaction error: {0}")]
    Transaction(String),
}

/// Umbrella error for binding operations
#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Backend(#[from] BackendFault),
}

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, PersistError>;
