//! Todo list state and its persisted record form

use serde::{Deserialize, Serialize};

use crate::codec::OrderedMap;

/// Todo identifier
pub type TodoId = u64;

/// Version written alongside every persisted state
pub const STATE_VERSION: u32 = 0;

/// Exact conversion from a JS number; `None` unless it is an integer in range
pub fn id_from_f64(value: f64) -> Option<TodoId> {
    // `TodoId::MAX as f64` rounds up to 2^64, which is already out of range
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value >= TodoId::MAX as f64 {
        return None;
    }
    Some(value as TodoId)
}

/// The persisted application state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoState {
    /// Todo text keyed by id, in insertion order
    #[serde(alias = "todos")]
    pub items: OrderedMap<TodoId, String>,
}

impl TodoState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next `add` will assign: max existing id + 1, or 0 when empty.
    ///
    /// Freed ids below the maximum are never handed out again, but removing
    /// the current maximum makes its id available to the next `add`.
    /// `None` once `TodoId::MAX` is in use.
    pub fn next_id(&self) -> Option<TodoId> {
        match self.items.keys().max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        }
    }

    /// Append a todo and return its id; refused when no id is left
    pub fn add(&mut self, text: impl Into<String>) -> Option<TodoId> {
        let Some(id) = self.next_id() else {
            log::warn!("Refusing add: todo id {} is already in use", TodoId::MAX);
            return None;
        };
        self.items.insert(id, text.into());
        Some(id)
    }

    pub fn remove(&mut self, id: TodoId) -> Option<String> {
        self.items.remove(&id)
    }
}

/// Record envelope stored under a storage key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState<T> {
    pub state: T,
    #[serde(default)]
    pub version: u32,
}

impl<T> PersistedState<T> {
    pub fn new(state: T) -> Self {
        Self {
            state,
            version: STATE_VERSION,
        }
    }
}
