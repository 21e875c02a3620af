//! Builder for constructing ReloadEngine instances.

use super::engine::Instrumentation;
use super::{EngineSettings, ReloadEngine, ReloadSource, Validate};
use crate::error::{ReloadError, Result};
use crate::sources::StoreConnector;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// Builder for constructing a [`ReloadEngine`].
///
/// Sources added directly and sources read from settings files are all
/// validated before anything is read or watched.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_props::prelude::*;
/// use hotswap_props::sources::FileStoreConnector;
///
/// # fn example() -> Result<()> {
/// let engine = ReloadEngine::builder()
///     .with_connector(FileStoreConnector)
///     .with_settings_file("config/reload.yaml")
///     .with_source(ReloadSource::new("/etc/myapp").with_path("/service.properties"))
///     .with_property("zone", "eu-west")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ReloadEngineBuilder {
    connector: Option<Arc<dyn StoreConnector>>,
    sources: Vec<ReloadSource>,
    settings_files: Vec<PathBuf>,
    properties: Vec<(String, String)>,
    instrumentation: Instrumentation,
}

impl ReloadEngineBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connector used to create store clients.
    pub fn with_connector<C: StoreConnector + 'static>(mut self, connector: C) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Set a shared connector.
    pub fn with_shared_connector(mut self, connector: Arc<dyn StoreConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Add a source. Sources are loaded in the order they are added.
    pub fn with_source(mut self, source: ReloadSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Load additional sources from a YAML, TOML or JSON settings file.
    ///
    /// Settings-file sources are loaded before sources added with
    /// [`with_source`](Self::with_source).
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_files.push(path.into());
        self
    }

    /// Define a local property before any source is loaded.
    ///
    /// Stored values for the same key replace it when sources load.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Enable metrics collection with the provided OpenTelemetry meter.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.instrumentation.metrics = Some(ReloadMetrics::new(meter));
        self
    }

    /// Build the engine, reading and watching every declared source.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No connector was specified
    /// - A settings file cannot be loaded
    /// - A source declaration is invalid
    /// - A required path cannot be read or watched
    pub fn build(self) -> Result<ReloadEngine> {
        let connector = self.connector.ok_or_else(|| {
            ReloadError::Configuration("No store connector specified".to_string())
        })?;

        let mut sources = Vec::new();
        for file in &self.settings_files {
            sources.extend(EngineSettings::from_file(file)?.sources);
        }
        sources.extend(self.sources);

        for source in &sources {
            source.validate()?;
        }

        let engine = ReloadEngine::assemble(connector, self.instrumentation);
        for (key, value) in self.properties {
            engine.set_property(key, value);
        }
        for source in &sources {
            engine.load_source(source)?;
        }

        info!(
            sources = sources.len(),
            properties = engine.table().len(),
            watches = engine.watches().active_count(),
            "Reload engine started"
        );
        Ok(engine)
    }
}
