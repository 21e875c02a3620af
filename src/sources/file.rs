//! File-backed coordination store.

use super::{CoordinationStore, StoreConnector, StoreError, StoreResult, StoreWatch, WatchCallback};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A coordination store backed by a directory tree.
///
/// The location is the root directory and each store path names a file relative
/// to it (`/app/props` maps to `<root>/app/props`). Watches use the `notify`
/// crate and deliver the file contents on its background thread whenever the
/// file is created, modified or removed.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_props::sources::{CoordinationStore, FileStore};
///
/// let store = FileStore::new("/etc/myapp/props");
/// let bytes = store.read("/service.properties")?;
/// # Ok::<(), hotswap_props::sources::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem.
    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl CoordinationStore for FileStore {
    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let file = self.resolve(path);
        fs::read(&file).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_string(),
            },
            _ => StoreError::Io {
                path: path.to_string(),
                reason: e.to_string(),
            },
        })
    }

    fn watch(&self, path: &str, callback: WatchCallback) -> StoreResult<Box<dyn StoreWatch>> {
        let file = self.resolve(path);
        let watch_error = |reason: String| StoreError::Watch {
            path: path.to_string(),
            reason,
        };

        // Watch the parent directory so atomic replace-by-rename is observed too.
        let dir = file
            .parent()
            .ok_or_else(|| watch_error("path has no parent directory".to_string()))?
            .canonicalize()
            .map_err(|e| watch_error(format!("Failed to resolve directory: {}", e)))?;
        let file_name = file
            .file_name()
            .ok_or_else(|| watch_error("path does not name a file".to_string()))?
            .to_os_string();
        let target = dir.join(&file_name);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }
                    if !event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()))
                    {
                        return;
                    }
                    debug!(path = %target.display(), kind = ?event.kind, "Watched file changed");
                    let payload = fs::read(&target).ok();
                    callback(payload);
                }
                Err(e) => warn!(error = %e, "File watch error"),
            }
        })
        .map_err(|e| watch_error(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(format!("Failed to watch path: {}", e)))?;

        Ok(Box::new(FileWatch {
            watcher: Some(watcher),
            dir,
        }))
    }

    fn name(&self) -> String {
        format!("file:{}", self.root.display())
    }
}

struct FileWatch {
    watcher: Option<RecommendedWatcher>,
    dir: PathBuf,
}

impl StoreWatch for FileWatch {
    fn close(&mut self) -> StoreResult<()> {
        match self.watcher.take() {
            Some(mut watcher) => watcher.unwatch(&self.dir).map_err(|e| StoreError::Watch {
                path: self.dir.display().to_string(),
                reason: format!("Failed to unwatch path: {}", e),
            }),
            None => Ok(()),
        }
    }
}

/// Connector producing a [`FileStore`] for each location.
///
/// The location must be an existing directory; the credential is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStoreConnector;

impl StoreConnector for FileStoreConnector {
    fn connect(
        &self,
        location: &str,
        _credential: Option<&str>,
    ) -> StoreResult<Arc<dyn CoordinationStore>> {
        let root = PathBuf::from(location);
        if !root.is_dir() {
            return Err(StoreError::Connection {
                location: location.to_string(),
                reason: "not an existing directory".to_string(),
            });
        }
        Ok(Arc::new(FileStore::new(root)))
    }
}
