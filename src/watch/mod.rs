//! Store watches keyed by (location, credential, path).

mod registry;

pub use registry::{BatchHandler, WatchHandle, WatchKey, WatchRegistry};
