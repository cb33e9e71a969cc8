//! Persistence binding: the todo list the UI talks to
//!
//! Lifecycle: `Uninitialized -> Hydrating -> Ready`.
//!
//! - Startup reads the preferred kind (always from the persistent backend),
//!   builds that adapter and hydrates from it.
//! - `add`/`remove` change memory immediately and spawn an encode+set. Writes
//!   are not awaited or ordered against each other. Until a hydration has
//!   completed they are refused, so an unloaded list never overwrites a
//!   stored one.
//! - Switching kind swaps the adapter, records the preference and hydrates
//!   again. Backends are separate silos; nothing is migrated.
//!
//! The binding is single-threaded: all methods take `&self` and no `RefCell`
//! borrow is held across an await.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::codec::{self, OrderedMap};
use crate::error::Result;
use crate::state::{PersistedState, STATE_VERSION, TodoId, TodoState};
use crate::storage::{AdapterFactory, AdapterHandle, PreferenceStore, StorageKind};

/// Where the binding is in its load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No hydration has completed (or the last one failed)
    Uninitialized,
    /// A `get` against the current adapter is outstanding
    Hydrating,
    /// State reflects the current backend
    Ready,
}

/// Observer run after every successful hydration
pub type HydrationHook = Box<dyn Fn(StorageKind, &TodoState)>;

fn log_hydration(kind: StorageKind, state: &TodoState) {
    log::info!(
        "State has been hydrated from {kind}: {} items",
        state.items.len()
    );
}

/// Todo list bound to a storage backend
pub struct TodoStore {
    factory: AdapterFactory,
    preferences: PreferenceStore,
    spawner: Rc<dyn LocalSpawn>,
    kind: Cell<StorageKind>,
    adapter: RefCell<AdapterHandle>,
    state: RefCell<TodoState>,
    phase: Cell<Phase>,
    /// Bumped per hydration so a superseded load cannot overwrite a newer one
    generation: Cell<u64>,
    on_hydrate: HydrationHook,
}

impl TodoStore {
    /// Build an unhydrated store; call [`start`](Self::start) next
    pub fn new(factory: AdapterFactory, spawner: Rc<dyn LocalSpawn>) -> Self {
        let kind = StorageKind::default();
        Self {
            preferences: factory.preferences(),
            adapter: RefCell::new(factory.create(kind)),
            factory,
            spawner,
            kind: Cell::new(kind),
            state: RefCell::new(TodoState::new()),
            phase: Cell::new(Phase::Uninitialized),
            generation: Cell::new(0),
            on_hydrate: Box::new(log_hydration),
        }
    }

    /// Build and start in one go
    pub async fn open(factory: AdapterFactory, spawner: Rc<dyn LocalSpawn>) -> Result<Self> {
        let store = Self::new(factory, spawner);
        store.start().await?;
        Ok(store)
    }

    /// Replace the default (logging) hydration observer
    pub fn with_hydration_hook(mut self, hook: impl Fn(StorageKind, &TodoState) + 'static) -> Self {
        self.on_hydrate = Box::new(hook);
        self
    }

    /// Select the preferred backend and hydrate from it
    pub async fn start(&self) -> Result<()> {
        let kind = self.preferences.load().await?;
        self.install(kind);
        self.hydrate().await
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.kind.get()
    }

    pub fn state(&self) -> Ref<'_, TodoState> {
        self.state.borrow()
    }

    /// Snapshot of the items in render order
    pub fn items(&self) -> OrderedMap<TodoId, String> {
        self.state.borrow().items.clone()
    }

    /// Record key for the current backend
    pub fn storage_key(&self) -> String {
        self.kind.get().storage_key(&self.factory.config().key_prefix)
    }

    /// Add a todo; returns its id, or `None` if the store is not `Ready`
    /// or the id space is exhausted
    pub fn add(&self, text: impl Into<String>) -> Option<TodoId> {
        if !self.accepts_mutations("add") {
            return None;
        }
        let id = self.state.borrow_mut().add(text)?;
        self.persist();
        Some(id)
    }

    /// Remove a todo; returns its text if it existed
    pub fn remove(&self, id: TodoId) -> Option<String> {
        if !self.accepts_mutations("remove") {
            return None;
        }
        let removed = self.state.borrow_mut().remove(id);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Empty the list and delete the record from the current backend
    ///
    /// Allowed in any phase; a hydration still in flight is discarded.
    pub async fn clear(&self) -> Result<()> {
        self.generation.set(self.generation.get() + 1);
        *self.state.borrow_mut() = TodoState::new();
        let adapter = self.adapter();
        adapter.remove(&self.storage_key()).await?;
        self.phase.set(Phase::Ready);
        log::info!("Cleared todo list in {}", adapter.label());
        Ok(())
    }

    /// Switch backends and hydrate from the new one
    ///
    /// The list starts empty until the new backend's record (if any) loads.
    /// A failure to record the preference does not stop the hydration; it
    /// is returned afterwards.
    pub async fn set_storage_kind(&self, kind: StorageKind) -> Result<()> {
        if kind == self.kind.get() && self.phase.get() == Phase::Ready {
            return Ok(());
        }
        log::info!("Switching storage from {} to {kind}", self.kind.get());
        self.install(kind);
        *self.state.borrow_mut() = TodoState::new();
        let saved = self.preferences.save(kind).await;
        if let Err(fault) = &saved {
            log::error!("Failed to record preferred storage {kind}: {fault}");
        }
        self.hydrate().await?;
        Ok(saved?)
    }

    /// Load the current backend's record into memory
    ///
    /// Absent record: memory becomes a fresh empty list. Corrupt record: `DecodeError`,
    /// phase drops back to `Uninitialized` and memory is untouched.
    pub async fn hydrate(&self) -> Result<()> {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.phase.set(Phase::Hydrating);

        let kind = self.kind.get();
        let adapter = self.adapter();
        let fetched = adapter.get(&self.storage_key()).await;

        if self.generation.get() != generation {
            log::debug!("Discarding hydration from {kind}: superseded");
            return Ok(());
        }

        let loaded = match fetched {
            Ok(Some(text)) => match codec::decode::<PersistedState<TodoState>>(&text) {
                Ok(record) => Some(record),
                Err(err) => {
                    log::error!("Error deserializing state from {}: {err}", adapter.label());
                    self.phase.set(Phase::Uninitialized);
                    return Err(err.into());
                }
            },
            Ok(None) => None,
            Err(fault) => {
                self.phase.set(Phase::Uninitialized);
                return Err(fault.into());
            }
        };

        let state = match loaded {
            Some(record) => {
                if record.version != STATE_VERSION {
                    log::warn!(
                        "Stored state version {} differs from {STATE_VERSION}; using it as is",
                        record.version
                    );
                }
                record.state
            }
            None => TodoState::new(),
        };
        *self.state.borrow_mut() = state;

        self.phase.set(Phase::Ready);
        (self.on_hydrate)(kind, &self.state.borrow());
        Ok(())
    }

    fn accepts_mutations(&self, action: &str) -> bool {
        let phase = self.phase.get();
        if phase != Phase::Ready {
            log::warn!("Ignoring {action} while {phase:?}: state not loaded yet");
        }
        phase == Phase::Ready
    }

    fn adapter(&self) -> AdapterHandle {
        self.adapter.borrow().clone()
    }

    fn install(&self, kind: StorageKind) {
        self.kind.set(kind);
        *self.adapter.borrow_mut() = self.factory.create(kind);
        self.phase.set(Phase::Uninitialized);
        // Any hydration still in flight belongs to the old adapter
        self.generation.set(self.generation.get() + 1);
    }

    /// Encode now, write later
    fn persist(&self) {
        let text = match codec::encode(&PersistedState::new(&*self.state.borrow())) {
            Ok(text) => text,
            Err(err) => {
                log::error!("Error serializing state: {err}");
                return;
            }
        };
        let adapter = self.adapter();
        let key = self.storage_key();

        let write = async move {
            if let Err(fault) = adapter.set(&key, &text).await {
                log::error!("Dropped write of {key} to {}: {fault}", adapter.label());
            }
        };
        if let Err(err) = self.spawner.spawn_local(write) {
            log::error!("Failed to schedule state write: {err}");
        }
    }
}
