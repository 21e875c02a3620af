//! Registry owning one store watch per watched path.

use crate::error::Result;
use crate::sources::{
    CoordinationStore, Encoding, PropertyBatch, StoreConnector, StoreResult, StoreWatch,
    WatchCallback, decode_payload,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// Receives the parsed batch of every non-empty payload delivered for a watched path.
///
/// Called on the store's notification thread.
pub trait BatchHandler: Send + Sync {
    /// Handle a batch read from `path`.
    fn on_batch(&self, path: &str, batch: PropertyBatch) -> Result<()>;
}

/// Identity of a watch. The handler is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchKey {
    /// Store location (e.g. a connection string)
    pub location: String,
    /// Opaque credential passed to the store client
    pub credential: Option<String>,
    /// Watched path
    pub path: String,
}

impl WatchKey {
    /// Build a key from its parts.
    pub fn new(location: &str, credential: Option<&str>, path: &str) -> Self {
        Self {
            location: location.to_string(),
            credential: credential.map(str::to_string),
            path: path.to_string(),
        }
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.location, self.path)
    }
}

/// A live watch on one path.
pub struct WatchHandle {
    key: WatchKey,
    watch: Mutex<Option<Box<dyn StoreWatch>>>,
}

impl WatchHandle {
    fn new(key: WatchKey, watch: Box<dyn StoreWatch>) -> Self {
        Self {
            key,
            watch: Mutex::new(Some(watch)),
        }
    }

    /// The key this handle was registered under.
    pub fn key(&self) -> &WatchKey {
        &self.key
    }

    /// Returns `true` until the watch has been closed.
    pub fn is_active(&self) -> bool {
        self.watch.lock().is_some()
    }

    fn close(&self) -> StoreResult<()> {
        match self.watch.lock().take() {
            Some(mut watch) => watch.close(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}

type ClientKey = (String, Option<String>);

/// Owns exactly one watch per (location, credential, path) and one store client
/// per (location, credential).
///
/// # Examples
///
/// ```rust
/// use hotswap_props::sources::{MemoryStore, PropertyBatch};
/// use hotswap_props::watch::{BatchHandler, WatchRegistry};
/// use std::sync::Arc;
///
/// struct Print;
///
/// impl BatchHandler for Print {
///     fn on_batch(&self, path: &str, batch: PropertyBatch) -> hotswap_props::error::Result<()> {
///         println!("{path}: {batch:?}");
///         Ok(())
///     }
/// }
///
/// let store = MemoryStore::new();
/// let registry = WatchRegistry::new(Arc::new(store.clone()));
/// registry.start_watch("zk:2181", None, "/app/props", Arc::new(Print))?;
/// store.put("/app/props", "greeting=hello");
/// # Ok::<(), hotswap_props::error::ReloadError>(())
/// ```
pub struct WatchRegistry {
    connector: Arc<dyn StoreConnector>,
    clients: Mutex<HashMap<ClientKey, Arc<dyn CoordinationStore>>>,
    handles: Mutex<HashMap<WatchKey, Arc<WatchHandle>>>,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl WatchRegistry {
    /// Create a registry that connects to stores through `connector`.
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            clients: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Attach a metrics collector.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: ReloadMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Store client for (location, credential), created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the connector cannot create the client.
    pub fn client(
        &self,
        location: &str,
        credential: Option<&str>,
    ) -> Result<Arc<dyn CoordinationStore>> {
        let mut clients = self.clients.lock();
        let key = (location.to_string(), credential.map(str::to_string));
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        let client = self.connector.connect(location, credential)?;
        debug!(location, store = %client.name(), "Created store client");
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Watch a UTF-8 encoded path.
    ///
    /// See [`WatchRegistry::start_watch_encoded`].
    pub fn start_watch(
        &self,
        location: &str,
        credential: Option<&str>,
        path: &str,
        handler: Arc<dyn BatchHandler>,
    ) -> Result<Arc<WatchHandle>> {
        self.start_watch_encoded(location, credential, path, Encoding::Utf8, handler)
    }

    /// Watch `path`, delivering each non-empty payload to `handler` as a parsed batch.
    ///
    /// If the (location, credential, path) triple is already watched the existing
    /// handle is returned and no new store watch is created. Absent or empty
    /// payloads are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store client or the store watch cannot be created.
    pub fn start_watch_encoded(
        &self,
        location: &str,
        credential: Option<&str>,
        path: &str,
        encoding: Encoding,
        handler: Arc<dyn BatchHandler>,
    ) -> Result<Arc<WatchHandle>> {
        let key = WatchKey::new(location, credential, path);
        let mut handles = self.handles.lock();

        if let Some(existing) = handles.get(&key) {
            info!(watch = %key, "Duplicated for watching");
            return Ok(Arc::clone(existing));
        }

        let client = self.client(location, credential)?;
        let watch = client.watch(path, self.payload_callback(path, encoding, handler))?;
        let handle = Arc::new(WatchHandle::new(key.clone(), watch));
        handles.insert(key, Arc::clone(&handle));
        info!(location, path, "Started watching path");

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.update_active_watches(handles.len());
        }

        Ok(handle)
    }

    fn payload_callback(
        &self,
        path: &str,
        encoding: Encoding,
        handler: Arc<dyn BatchHandler>,
    ) -> WatchCallback {
        let path = path.to_string();
        #[cfg(feature = "metrics")]
        let metrics = self.metrics.clone();

        Arc::new(move |payload: Option<Vec<u8>>| {
            let bytes = match payload {
                Some(bytes) if !bytes.is_empty() => bytes,
                _ => {
                    warn!(path = %path, "Watched path has no data, ignoring change");
                    #[cfg(feature = "metrics")]
                    if let Some(metrics) = &metrics {
                        metrics.record_blank_payload(&path);
                    }
                    return;
                }
            };

            let batch = match decode_payload(&bytes, encoding) {
                Ok(batch) => batch,
                Err(e) => {
                    error!(path = %path, error = %e, "Failed to decode watched payload");
                    return;
                }
            };

            if let Err(e) = handler.on_batch(&path, batch) {
                error!(path = %path, error = %e, "Failed to handle property batch");
            }
        })
    }

    /// Stop watching the (location, credential, path) triple.
    ///
    /// Returns `true` if a watch was removed. Errors releasing the store watch are
    /// logged, never returned.
    pub fn stop_watch(&self, location: &str, credential: Option<&str>, path: &str) -> bool {
        let key = WatchKey::new(location, credential, path);
        let removed = {
            let mut handles = self.handles.lock();
            let removed = handles.remove(&key);
            #[cfg(feature = "metrics")]
            if let Some(metrics) = &self.metrics {
                metrics.update_active_watches(handles.len());
            }
            removed
        };

        match removed {
            Some(handle) => {
                release(&handle);
                true
            }
            None => false,
        }
    }

    /// Stop every watch.
    pub fn stop_all(&self) {
        let drained: Vec<Arc<WatchHandle>> = self.handles.lock().drain().map(|(_, h)| h).collect();

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.update_active_watches(0);
        }

        for handle in drained {
            release(&handle);
        }
    }

    /// Number of active watches.
    pub fn active_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Returns `true` if the triple is being watched.
    pub fn is_watching(&self, location: &str, credential: Option<&str>, path: &str) -> bool {
        self.handles
            .lock()
            .contains_key(&WatchKey::new(location, credential, path))
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn release(handle: &WatchHandle) {
    match handle.close() {
        Ok(()) => info!(watch = %handle.key(), "Stopped watching path"),
        Err(e) => warn!(watch = %handle.key(), error = %e, "Failed to release watch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReloadError;
    use crate::sources::{MemoryStore, StoreError};

    #[derive(Default)]
    struct Recorder {
        batches: Mutex<Vec<(String, PropertyBatch)>>,
    }

    impl BatchHandler for Recorder {
        fn on_batch(&self, path: &str, batch: PropertyBatch) -> Result<()> {
            self.batches.lock().push((path.to_string(), batch));
            Ok(())
        }
    }

    #[test]
    fn test_payload_reaches_handler() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));
        let recorder = Arc::new(Recorder::default());

        registry
            .start_watch("zk:2181", None, "/app", recorder.clone())
            .unwrap();
        store.put("/app", "a=1\nb=2");

        let batches = recorder.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, "/app");
        assert_eq!(batches[0].1["a"], "1");
        assert_eq!(batches[0].1["b"], "2");
    }

    #[test]
    fn test_blank_payload_is_ignored() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));
        let recorder = Arc::new(Recorder::default());

        registry
            .start_watch("zk:2181", None, "/app", recorder.clone())
            .unwrap();
        store.put("/app", "");
        store.remove("/app");

        assert!(recorder.batches.lock().is_empty());
    }

    #[test]
    fn test_duplicate_watch_returns_existing_handle() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));
        let recorder = Arc::new(Recorder::default());

        let first = registry
            .start_watch("zk:2181", Some("u:p"), "/app", recorder.clone())
            .unwrap();
        let second = registry
            .start_watch("zk:2181", Some("u:p"), "/app", Arc::new(Recorder::default()))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.active_count(), 1);
        assert_eq!(store.watch_count("/app"), 1);

        store.put("/app", "k=v");
        assert_eq!(recorder.batches.lock().len(), 1);
    }

    #[test]
    fn test_credential_is_part_of_key() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));

        registry
            .start_watch("zk:2181", None, "/app", Arc::new(Recorder::default()))
            .unwrap();
        registry
            .start_watch("zk:2181", Some("u:p"), "/app", Arc::new(Recorder::default()))
            .unwrap();

        assert_eq!(registry.active_count(), 2);
        assert_eq!(store.connection_count(), 2);
    }

    #[test]
    fn test_client_is_cached() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));

        registry.client("zk:2181", None).unwrap();
        registry
            .start_watch("zk:2181", None, "/a", Arc::new(Recorder::default()))
            .unwrap();
        registry
            .start_watch("zk:2181", None, "/b", Arc::new(Recorder::default()))
            .unwrap();

        assert_eq!(store.connection_count(), 1);
    }

    #[test]
    fn test_stop_watch() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));
        let recorder = Arc::new(Recorder::default());

        let handle = registry
            .start_watch("zk:2181", None, "/app", recorder.clone())
            .unwrap();
        assert!(registry.is_watching("zk:2181", None, "/app"));
        assert!(!registry.is_watching("zk:2181", Some("u:p"), "/app"));
        assert!(registry.stop_watch("zk:2181", None, "/app"));
        assert!(!registry.stop_watch("zk:2181", None, "/app"));
        assert!(!registry.is_watching("zk:2181", None, "/app"));
        assert!(!handle.is_active());
        assert_eq!(store.watch_count("/app"), 0);

        store.put("/app", "k=v");
        assert!(recorder.batches.lock().is_empty());
    }

    #[test]
    fn test_stop_all_releases_store_watches() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));

        for path in ["/a", "/b"] {
            registry
                .start_watch("zk:2181", None, path, Arc::new(Recorder::default()))
                .unwrap();
        }
        registry.stop_all();

        assert_eq!(registry.active_count(), 0);
        assert_eq!(store.watch_count("/a"), 0);
        assert_eq!(store.watch_count("/b"), 0);
    }

    #[test]
    fn test_connection_failure_propagates() {
        struct Unreachable;

        impl StoreConnector for Unreachable {
            fn connect(
                &self,
                location: &str,
                _credential: Option<&str>,
            ) -> StoreResult<Arc<dyn CoordinationStore>> {
                Err(StoreError::Connection {
                    location: location.to_string(),
                    reason: "refused".to_string(),
                })
            }
        }

        let registry = WatchRegistry::new(Arc::new(Unreachable));
        let result = registry.start_watch("zk:2181", None, "/app", Arc::new(Recorder::default()));
        assert!(matches!(result, Err(ReloadError::Store(StoreError::Connection { .. }))));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_latin1_payload() {
        let store = MemoryStore::new();
        let registry = WatchRegistry::new(Arc::new(store.clone()));
        let recorder = Arc::new(Recorder::default());

        registry
            .start_watch_encoded("zk:2181", None, "/app", Encoding::Latin1, recorder.clone())
            .unwrap();
        store.put("/app", b"name=caf\xe9".to_vec());

        assert_eq!(recorder.batches.lock()[0].1["name"], "café");
    }
}
