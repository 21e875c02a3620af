//! Coordination store contract.

use std::sync::Arc;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Callback invoked by a store whenever a watched path changes.
///
/// Receives the current payload of the path, or `None` when the path has no data
/// (for example after it was deleted).
pub type WatchCallback = Arc<dyn Fn(Option<Vec<u8>>) + Send + Sync>;

/// Errors reported by a coordination store client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested path does not exist.
    #[error("No data found at path: {path}")]
    NotFound {
        /// The missing path
        path: String,
    },

    /// A client for the given location could not be created.
    #[error("Unable to connect to [{location}]: {reason}")]
    Connection {
        /// The store location
        location: String,
        /// Why the connection failed
        reason: String,
    },

    /// A watch could not be registered or released.
    #[error("Watch failed for path [{path}]: {reason}")]
    Watch {
        /// The watched path
        path: String,
        /// Why the watch failed
        reason: String,
    },

    /// Reading from the store failed for another reason.
    #[error("IO error reading [{path}]: {reason}")]
    Io {
        /// The path being read
        path: String,
        /// The underlying failure
        reason: String,
    },
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Client for a watchable key/value coordination store.
///
/// Implement this trait to plug in a real store client (ZooKeeper, etcd, Consul).
/// Connection management, sessions and retries belong to the implementation.
pub trait CoordinationStore: Send + Sync {
    /// Read the raw bytes stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the path does not exist.
    fn read(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Start watching `path`, invoking `callback` with the current payload on every change.
    ///
    /// The callback may run on a background thread owned by the store client.
    /// The watch stays live until the returned guard is closed.
    fn watch(&self, path: &str, callback: WatchCallback) -> StoreResult<Box<dyn StoreWatch>>;

    /// Get a human-readable name for this store (for logging/debugging).
    fn name(&self) -> String;
}

/// A live watch resource owned by a [`crate::watch::WatchHandle`].
pub trait StoreWatch: Send {
    /// Release the watch. Calling `close` more than once must be harmless.
    fn close(&mut self) -> StoreResult<()>;
}

/// Creates store clients for a (location, credential) pair.
///
/// The credential is opaque and passed through unchanged.
pub trait StoreConnector: Send + Sync {
    /// Connect to the store at `location`.
    fn connect(
        &self,
        location: &str,
        credential: Option<&str>,
    ) -> StoreResult<Arc<dyn CoordinationStore>>;
}
