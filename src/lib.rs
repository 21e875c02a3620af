//! # hotswap-props
//!
//! Live-reloading property bindings backed by a watchable key/value coordination store.
//!
//! ## Overview
//!
//! `hotswap-props` keeps in-process values synchronized with `key=value` properties
//! stored under watched paths of a coordination store:
//! - Bootstrap reads of every declared path, merged into one property table
//! - `${name}` / `${name:default}` expressions bound to typed slots
//! - Lock-free slot reads using `arc-swap`; every reload is a single atomic swap
//! - Change events for exactly the expressions whose resolved value changed
//!
//! ## Quick Start
//!
//! ```rust
//! use hotswap_props::prelude::*;
//! use hotswap_props::sources::MemoryStore;
//!
//! # fn example() -> Result<()> {
//! let store = MemoryStore::new();
//! store.put("/app/props", "listProperty=Value1;Value2;Value3\ntimeout=30");
//!
//! let engine = ReloadEngine::builder()
//!     .with_connector(store.clone())
//!     .with_source(ReloadSource::new("zk1:2181").with_path("/app/props"))
//!     .build()?;
//!
//! let items = engine.bind_list("${listProperty}")?;
//! let timeout = engine.bind::<u32>("${timeout}")?;
//! assert_eq!(items.get().len(), 3);
//!
//! // A write to the watched path updates bound slots in place.
//! store.put("/app/props", "listProperty=A;B\ntimeout=45");
//! assert_eq!(*items.get(), vec!["A".to_string(), "B".to_string()]);
//! assert_eq!(*timeout.get(), 45);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Stores
//!
//! A store is anything implementing [`sources::CoordinationStore`], created per
//! (location, credential) by a [`sources::StoreConnector`]. The crate ships an
//! in-process [`sources::MemoryStore`] and, with the `file-watch` feature, a
//! directory-backed [`sources::FileStore`].
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): file-backed store using `notify`
//! - `async-events`: `tokio` broadcast stream of change events
//! - `metrics`: OpenTelemetry metrics for the reload pipeline

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod sources;
pub mod watch;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        CustomConversion, DefaultConversion, ListConversion, PropertyConversion, ReloadEngine,
        ReloadEngineBuilder, ReloadSource, Reloadable, Validate,
    };
    pub use crate::error::{ReloadError, Result};
    pub use crate::notify::{ChangeEvent, ChangeListener};
}
