//! Built-in metrics for the reload pipeline.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Batches received from watched paths
//! - Blank payloads ignored
//! - Change notifications published
//! - Conversion and resolution failures
//! - Active watches
//! - Publish duration
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotswap_props::prelude::*;
//! use hotswap_props::sources::MemoryStore;
//! use opentelemetry::global;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("my-app");
//!
//! let engine = ReloadEngine::builder()
//!     .with_connector(MemoryStore::new())
//!     .with_metrics(meter)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod reload_metrics;

pub use reload_metrics::ReloadMetrics;
