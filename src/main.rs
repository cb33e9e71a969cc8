//! Todo Persist entry point
//!
//! On the web this installs logging; the UI drives `TodoStoreHandle`.
//! Natively it runs a short walkthrough against in-memory backends.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Logger already set: {err}").into());
    }
    log::info!("Todo Persist ready");
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::rc::Rc;

    use futures::executor::LocalPool;
    use todo_persist::{AdapterFactory, PersistConfig, StorageKind, TodoStore};

    env_logger::init();
    log::info!("Todo Persist (native) starting with in-memory backends...");

    let mut pool = LocalPool::new();
    let spawner = Rc::new(pool.spawner());
    let factory = AdapterFactory::in_memory(PersistConfig::default());
    let store = match pool.run_until(TodoStore::open(factory, spawner)) {
        Ok(store) => store,
        Err(err) => {
            log::error!("Failed to open todo store: {err}");
            std::process::exit(1);
        }
    };

    for text in ["buy milk", "water plants", "call mom"] {
        match store.add(text) {
            Some(id) => log::info!("Added #{id}: {text}"),
            None => log::warn!("Could not add {text}"),
        }
    }
    store.remove(1);
    pool.run_until_stalled();

    for kind in [StorageKind::Transactional, StorageKind::Persistent] {
        if let Err(err) = pool.run_until(store.set_storage_kind(kind)) {
            log::error!("Failed to switch to {kind}: {err}");
            continue;
        }
        let items = store.items();
        log::info!("{kind}: {} items", items.len());
        for (id, text) in items.iter() {
            println!("[{kind}] #{id} {text}");
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
