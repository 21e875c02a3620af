//! Bootstrap reads for declared sources.

use super::{PropertyTable, ReloadSource};
use crate::error::{ReloadError, Result};
use crate::sources::decode_payload;
use crate::watch::WatchRegistry;
use tracing::{debug, info, warn};

/// Performs the initial synchronous read of every path in a source.
///
/// Paths are read in declaration order and merged into the table, so a key
/// defined by several paths takes the value from the last one.
pub(crate) struct SnapshotLoader<'a> {
    registry: &'a WatchRegistry,
    table: &'a PropertyTable,
}

impl<'a> SnapshotLoader<'a> {
    pub(crate) fn new(registry: &'a WatchRegistry, table: &'a PropertyTable) -> Self {
        Self { registry, table }
    }

    /// Read and merge every path of `source`.
    ///
    /// Returns the paths that were read and should be watched. Blank paths and,
    /// when the source allows it, missing paths are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Resource`] if a path cannot be read, or an error if
    /// the store client cannot be created or a payload cannot be decoded.
    pub(crate) fn load(&self, source: &ReloadSource) -> Result<Vec<String>> {
        let encoding = source.resolved_encoding()?;
        let credential = source.credential.as_deref();
        let client = self.registry.client(&source.location, credential)?;
        let mut loaded = Vec::with_capacity(source.paths.len());

        for path in &source.paths {
            if path.trim().is_empty() {
                warn!(location = %source.location, "Skipping blank path in source declaration");
                continue;
            }

            let bytes = match client.read(path) {
                Ok(bytes) => bytes,
                Err(e) if e.is_not_found() && source.ignore_resource_not_found => {
                    warn!(location = %source.location, path = %path, "Properties path not found, ignoring");
                    continue;
                }
                Err(e) => {
                    return Err(ReloadError::Resource {
                        path: path.clone(),
                        source: e,
                    });
                }
            };

            let batch = decode_payload(&bytes, encoding)?;
            debug!(path = %path, properties = batch.len(), "Read properties path");
            self.table.merge(&batch);
            loaded.push(path.clone());
        }

        info!(
            location = %source.location,
            paths = loaded.len(),
            properties = self.table.len(),
            "Loaded properties from store"
        );
        Ok(loaded)
    }
}
