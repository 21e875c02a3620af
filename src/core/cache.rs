//! Last-delivered resolved values per subscription key.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Mapping from subscription key to the value most recently delivered to subscribers.
///
/// Used only to decide whether a recomputed resolution is a change.
#[derive(Debug, Default)]
pub struct ResolvedValueCache {
    values: Mutex<HashMap<String, String>>,
}

impl ResolvedValueCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last delivered value for `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    /// Record the value assigned when a binding is created.
    pub fn record(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.lock().insert(key.into(), value.into());
    }

    /// Store `new_value` if it differs from the cached value.
    ///
    /// Returns `None` when nothing changed, otherwise `Some(previous)` where
    /// `previous` is the old value (or `None` if the key was never cached).
    /// Compare and store happen under one lock so concurrent reloads of
    /// different paths cannot both report the same transition.
    pub fn replace_if_changed(&self, key: &str, new_value: &str) -> Option<Option<String>> {
        let mut values = self.values.lock();
        match values.get(key) {
            Some(current) if current == new_value => None,
            _ => Some(values.insert(key.to_string(), new_value.to_string())),
        }
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}
