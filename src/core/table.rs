//! Mutable property table with placeholder resolution.

use super::placeholder::{self, Segment};
use crate::error::{ReloadError, Result};
use crate::sources::PropertyBatch;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Store of raw (unresolved) property values.
///
/// A missing key is represented by absence, never by an empty string. Values are
/// kept exactly as loaded; placeholders inside them are not expanded.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::PropertyTable;
///
/// let table = PropertyTable::new();
/// table.set("base", "World");
/// assert_eq!(table.resolve("Hello, ${base}!").unwrap(), "Hello, World!");
/// assert_eq!(table.resolve("${missing:fallback}").unwrap(), "fallback");
/// ```
#[derive(Debug, Default)]
pub struct PropertyTable {
    entries: RwLock<HashMap<String, String>>,
}

impl PropertyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Returns `true` if `key` has a value.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Overwrite the value for `key`, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.write().insert(key.into(), value.into())
    }

    /// Overwrite every key present in `batch`.
    ///
    /// Keys absent from the batch are left untouched; a merge never deletes.
    pub fn merge(&self, batch: &PropertyBatch) {
        let mut entries = self.entries.write();
        for (key, value) in batch {
            entries.insert(key.clone(), value.clone());
        }
    }

    /// Overwrite keys from `batch` that already exist with a different value.
    ///
    /// Keys the table does not know are ignored. Returns the updated keys.
    pub fn update_known(&self, batch: &PropertyBatch) -> Vec<String> {
        let mut entries = self.entries.write();
        let mut updated = Vec::new();
        for (key, value) in batch {
            if let Some(current) = entries.get_mut(key) {
                if current != value {
                    current.clone_from(value);
                    updated.push(key.clone());
                }
            }
        }
        updated
    }

    /// All keys currently in the table.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the table holds no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Resolve every `${name}` / `${name:default}` marker in `expression`.
    ///
    /// Substituted text is used verbatim and never scanned again.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Resolution`] if a marker has no value and no default.
    pub fn resolve(&self, expression: &str) -> Result<String> {
        let entries = self.entries.read();
        let mut resolved = String::with_capacity(expression.len());

        for segment in placeholder::segments(expression) {
            match segment {
                Segment::Literal(text) => resolved.push_str(text),
                Segment::Placeholder { name, default } => match (entries.get(name), default) {
                    (Some(value), _) => resolved.push_str(value),
                    (None, Some(default)) => {
                        debug!(key = name, "Could not find key in properties, using default");
                        resolved.push_str(default);
                    }
                    (None, None) => {
                        return Err(ReloadError::Resolution {
                            placeholder: name.to_string(),
                            expression: expression.to_string(),
                        });
                    }
                },
            }
        }
        Ok(resolved)
    }
}
