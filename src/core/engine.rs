//! The reload engine tying tables, watches and bindings together.

use super::{
    ChangePublisher, DefaultConversion, ListConversion, PropertyConversion, PropertyTable,
    ReloadEngineBuilder, ReloadSource, Reloadable, ResolvedValueCache, SlotBinding, Validate,
    placeholder, slot::convert_for,
};
use crate::error::{ReloadError, Result};
use crate::notify::{
    ChangeEvent, ChangeListener, ChangeNotifier, ListenerId, SubscriptionRegistry, TargetBinding,
    ValueBinder,
};
use crate::sources::StoreConnector;
use crate::watch::{BatchHandler, WatchRegistry};
use parking_lot::Mutex;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

#[cfg(feature = "async-events")]
use crate::notify::BroadcastListener;
#[cfg(feature = "async-events")]
use std::sync::OnceLock;

/// Optional collectors threaded into the engine's components.
#[derive(Clone, Default)]
pub(crate) struct Instrumentation {
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<ReloadMetrics>,
}

/// Keeps bound values synchronized with properties stored in a watchable
/// coordination store.
///
/// Properties are read once when a source is loaded and then watched. Every
/// payload delivered for a watched path is merged into the property table, each
/// bound expression is re-resolved, and slots whose resolved value changed are
/// updated in place. All of this runs synchronously on the store's notification
/// thread.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::prelude::*;
/// use hotswap_props::sources::MemoryStore;
///
/// # fn example() -> Result<()> {
/// let store = MemoryStore::new();
/// store.put("/app/props", "base=World\nport=8080");
///
/// let engine = ReloadEngine::builder()
///     .with_connector(store.clone())
///     .with_source(ReloadSource::new("zk:2181").with_path("/app/props"))
///     .build()?;
///
/// let greeting = engine.bind::<String>("Hello, ${base}!")?;
/// let port = engine.bind::<u16>("${port}")?;
/// assert_eq!(*greeting.get(), "Hello, World!");
///
/// store.put("/app/props", "base=Universe\nport=9090");
/// assert_eq!(*greeting.get(), "Hello, Universe!");
/// assert_eq!(*port.get(), 9090);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ReloadEngine {
    table: Arc<PropertyTable>,
    subscriptions: Arc<SubscriptionRegistry>,
    cache: Arc<ResolvedValueCache>,
    notifier: Arc<ChangeNotifier>,
    publisher: Arc<ChangePublisher>,
    watches: WatchRegistry,
    binder: Mutex<Option<ListenerId>>,
    #[cfg(feature = "async-events")]
    events: OnceLock<Arc<BroadcastListener>>,
}

impl ReloadEngine {
    /// Create an engine with no sources that connects to stores through `connector`.
    ///
    /// Prefer [`ReloadEngine::builder`], which also loads declared sources.
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self::assemble(connector, Instrumentation::default())
    }

    /// Create a builder.
    pub fn builder() -> ReloadEngineBuilder {
        ReloadEngineBuilder::new()
    }

    pub(crate) fn assemble(
        connector: Arc<dyn StoreConnector>,
        instrumentation: Instrumentation,
    ) -> Self {
        let table = Arc::new(PropertyTable::new());
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let cache = Arc::new(ResolvedValueCache::new());
        let notifier = Arc::new(ChangeNotifier::new());

        let binder = ValueBinder::new(Arc::clone(&subscriptions));
        let publisher = ChangePublisher::new(
            Arc::clone(&table),
            Arc::clone(&subscriptions),
            Arc::clone(&cache),
            Arc::clone(&notifier),
        );
        let watches = WatchRegistry::new(connector);

        #[cfg(feature = "metrics")]
        let (binder, publisher, watches) = match instrumentation.metrics {
            Some(metrics) => (
                binder.with_metrics(metrics.clone()),
                publisher.with_metrics(metrics.clone()),
                watches.with_metrics(metrics),
            ),
            None => (binder, publisher, watches),
        };
        #[cfg(not(feature = "metrics"))]
        let _ = instrumentation;

        let binder_id = notifier.register(Arc::new(binder));

        Self {
            table,
            subscriptions,
            cache,
            notifier,
            publisher: Arc::new(publisher),
            watches,
            binder: Mutex::new(Some(binder_id)),
            #[cfg(feature = "async-events")]
            events: OnceLock::new(),
        }
    }

    /// Read every path of `source` into the property table and start watching them.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is invalid, if a path cannot be read
    /// (unless it is missing and the source ignores missing paths), or if a
    /// watch cannot be started.
    pub fn load_source(&self, source: &ReloadSource) -> Result<()> {
        source.validate()?;
        let encoding = source.resolved_encoding()?;
        let paths = super::loader::SnapshotLoader::new(&self.watches, &self.table).load(source)?;

        let handler: Arc<dyn BatchHandler> = self.publisher.clone();
        for path in paths {
            self.watches.start_watch_encoded(
                &source.location,
                source.credential.as_deref(),
                &path,
                encoding,
                Arc::clone(&handler),
            )?;
        }
        Ok(())
    }

    /// Stop watching one path. Returns `true` if a watch was removed.
    pub fn stop_watch(&self, location: &str, credential: Option<&str>, path: &str) -> bool {
        self.watches.stop_watch(location, credential, path)
    }

    /// Bind `expression` to a new slot using [`FromStr`] conversion.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if a placeholder has no value and no default,
    /// or a conversion error if the resolved value cannot be parsed.
    pub fn bind<T>(&self, expression: &str) -> Result<Reloadable<T>>
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: Display,
    {
        self.bind_with(expression, DefaultConversion)
    }

    /// Bind `expression` to a new list slot, splitting values on `;`.
    pub fn bind_list(&self, expression: &str) -> Result<Reloadable<Vec<String>>> {
        self.bind_with(expression, ListConversion)
    }

    /// Bind `expression` to a new slot using `conversion`.
    ///
    /// The slot is named after the expression.
    pub fn bind_with<T, C>(&self, expression: &str, conversion: C) -> Result<Reloadable<T>>
    where
        T: Send + Sync + 'static,
        C: PropertyConversion<T> + 'static,
    {
        let _exclusive = self.publisher.exclusive();
        let resolved = self.table.resolve(expression)?;
        let value = conversion.convert(&resolved).map_err(|reason| {
            ReloadError::conversion(expression, resolved.as_str(), std::any::type_name::<T>(), reason)
        })?;

        let slot = Reloadable::new(expression, value);
        self.subscribe(expression, &slot, conversion, resolved);
        Ok(slot)
    }

    /// Bind `expression` to an existing slot, assigning its current resolution.
    ///
    /// Binding the same slot to the same expression again only re-assigns the value.
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the slot unchanged if resolution or conversion fails.
    pub fn bind_slot<T, C>(&self, expression: &str, slot: &Reloadable<T>, conversion: C) -> Result<()>
    where
        T: Send + Sync + 'static,
        C: PropertyConversion<T> + 'static,
    {
        let _exclusive = self.publisher.exclusive();
        let resolved = self.table.resolve(expression)?;
        let value = convert_for(slot, &conversion, &resolved)?;
        slot.store(value);
        self.subscribe(expression, slot, conversion, resolved);
        Ok(())
    }

    fn subscribe<T, C>(&self, expression: &str, slot: &Reloadable<T>, conversion: C, resolved: String)
    where
        T: Send + Sync + 'static,
        C: PropertyConversion<T> + 'static,
    {
        if !placeholder::has_placeholders(expression) {
            debug!(expression, "Bound expression has no placeholders and will never reload");
        }
        let binding = TargetBinding::new(Arc::new(SlotBinding::new(slot.clone(), conversion)));
        if self.subscriptions.subscribe(expression, binding) {
            info!(expression, target = slot.name(), value = %resolved, "Bound property");
        } else {
            debug!(expression, target = slot.name(), "Slot already bound to expression");
        }
        self.cache.record(expression, resolved);
    }

    /// Register a listener for every change event.
    pub fn register_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        self.notifier.register(listener)
    }

    /// Register a closure for every change event.
    pub fn register_fn<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.notifier.register_fn(f)
    }

    /// Remove a previously registered listener.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.notifier.unregister(id)
    }

    /// Receive every change event asynchronously.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use hotswap_props::prelude::*;
    /// # async fn example(engine: ReloadEngine) {
    /// let mut changes = engine.change_stream();
    /// while let Ok(event) = changes.recv().await {
    ///     println!("{} -> {}", event.key(), event.new_value());
    /// }
    /// # }
    /// ```
    #[cfg(feature = "async-events")]
    pub fn change_stream(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent> {
        self.events
            .get_or_init(|| {
                let listener = Arc::new(BroadcastListener::default());
                self.notifier.register(listener.clone());
                listener
            })
            .subscribe()
    }

    /// Resolve an expression against the current properties.
    pub fn resolve(&self, expression: &str) -> Result<String> {
        self.table.resolve(expression)
    }

    /// The raw value of a property.
    pub fn property(&self, key: &str) -> Option<String> {
        self.table.get(key)
    }

    /// Define a property locally. It is not published until the next reload batch.
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.table.set(key, value)
    }

    /// The property table.
    pub fn table(&self) -> &Arc<PropertyTable> {
        &self.table
    }

    /// Live subscriptions.
    pub fn subscriptions(&self) -> &Arc<SubscriptionRegistry> {
        &self.subscriptions
    }

    /// The change notification bus.
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// The watch registry.
    pub fn watches(&self) -> &WatchRegistry {
        &self.watches
    }

    /// Stop every watch and detach the value binder.
    ///
    /// Bound slots keep their last values. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if let Some(id) = self.binder.lock().take() {
            self.notifier.unregister(id);
        }
        self.watches.stop_all();
        info!("Reload engine shut down");
    }
}
