//! In-process coordination store.

use super::{CoordinationStore, StoreConnector, StoreError, StoreResult, StoreWatch, WatchCallback};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A watchable in-memory store useful for testing and embedded environments.
///
/// Writes through [`MemoryStore::put`] and [`MemoryStore::remove`] deliver watch
/// callbacks synchronously on the writer's thread, standing in for the
/// notification thread of a remote store client. Writes and their deliveries are
/// serialized, so the last payload a watcher sees is always the stored one.
///
/// The store is also its own [`StoreConnector`]: every (location, credential)
/// pair connects to the same shared data.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::sources::{CoordinationStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.put("/app/props", "greeting=hello");
/// assert_eq!(store.read("/app/props").unwrap(), b"greeting=hello".to_vec());
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    delivery: Arc<ReentrantMutex<()>>,
}

#[derive(Default)]
struct MemoryInner {
    nodes: HashMap<String, Vec<u8>>,
    watches: HashMap<String, Vec<(u64, WatchCallback)>>,
    next_watch_id: u64,
    connections: usize,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `data` at `path` and notify every watcher of the path.
    pub fn put(&self, path: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        let _delivery = self.delivery.lock();
        let callbacks = {
            let mut inner = self.inner.lock();
            inner.nodes.insert(path.to_string(), data.clone());
            inner.callbacks_for(path)
        };
        debug!(path, watchers = callbacks.len(), "Memory store node written");
        for callback in callbacks {
            callback(Some(data.clone()));
        }
    }

    /// Delete `path` and notify every watcher with an absent payload.
    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        let _delivery = self.delivery.lock();
        let (previous, callbacks) = {
            let mut inner = self.inner.lock();
            let previous = inner.nodes.remove(path);
            (previous, inner.callbacks_for(path))
        };
        for callback in callbacks {
            callback(None);
        }
        previous
    }

    /// Number of live watches registered on `path`.
    pub fn watch_count(&self, path: &str) -> usize {
        self.inner.lock().watches.get(path).map_or(0, Vec::len)
    }

    /// Number of times a client was created through [`StoreConnector::connect`].
    pub fn connection_count(&self) -> usize {
        self.inner.lock().connections
    }
}

impl MemoryInner {
    fn callbacks_for(&self, path: &str) -> Vec<WatchCallback> {
        self.watches
            .get(path)
            .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }
}

impl CoordinationStore for MemoryStore {
    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.inner
            .lock()
            .nodes
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    fn watch(&self, path: &str, callback: WatchCallback) -> StoreResult<Box<dyn StoreWatch>> {
        let mut inner = self.inner.lock();
        let id = inner.next_watch_id;
        inner.next_watch_id += 1;
        inner
            .watches
            .entry(path.to_string())
            .or_default()
            .push((id, callback));

        Ok(Box::new(MemoryWatch {
            id,
            path: path.to_string(),
            store: Arc::clone(&self.inner),
            closed: false,
        }))
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

impl StoreConnector for MemoryStore {
    fn connect(
        &self,
        location: &str,
        _credential: Option<&str>,
    ) -> StoreResult<Arc<dyn CoordinationStore>> {
        self.inner.lock().connections += 1;
        debug!(location, "Memory store client created");
        Ok(Arc::new(self.clone()))
    }
}

struct MemoryWatch {
    id: u64,
    path: String,
    store: Arc<Mutex<MemoryInner>>,
    closed: bool,
}

impl StoreWatch for MemoryWatch {
    fn close(&mut self) -> StoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut inner = self.store.lock();
        if let Some(entries) = inner.watches.get_mut(&self.path) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                inner.watches.remove(&self.path);
            }
        }
        Ok(())
    }
}

impl Drop for MemoryWatch {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
