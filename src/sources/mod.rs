//! Coordination store contract, payload format and store implementations.

#[cfg(feature = "file-watch")]
mod file;
mod memory;
pub mod properties;
mod store;

#[cfg(feature = "file-watch")]
pub use file::{FileStore, FileStoreConnector};
pub use memory::MemoryStore;
pub use properties::{Encoding, PropertyBatch, decode_payload, parse_properties};
pub use store::{
    CoordinationStore, StoreConnector, StoreError, StoreResult, StoreWatch, WatchCallback,
};
