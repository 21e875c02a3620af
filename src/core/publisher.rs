//! Turns reloaded batches into change notifications.

use super::{PropertyTable, ResolvedValueCache};
use crate::error::{ReloadError, Result};
use crate::notify::{ChangeEvent, ChangeNotifier, SubscriptionRegistry};
use crate::sources::PropertyBatch;
use crate::watch::BatchHandler;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// Applies a batch to the property table and publishes one [`ChangeEvent`] per
/// subscription whose resolved value changed.
///
/// Every live subscription is recomputed for every batch, since an expression
/// may depend on any key. A subscription that fails to resolve is skipped with a
/// warning and keeps its last delivered value.
///
/// Batches are published one at a time, so resolving, caching and posting for one
/// batch never interleave with another batch.
pub struct ChangePublisher {
    exclusive: ReentrantMutex<()>,
    table: Arc<PropertyTable>,
    subscriptions: Arc<SubscriptionRegistry>,
    cache: Arc<ResolvedValueCache>,
    notifier: Arc<ChangeNotifier>,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl ChangePublisher {
    /// Create a publisher over the shared engine state.
    pub fn new(
        table: Arc<PropertyTable>,
        subscriptions: Arc<SubscriptionRegistry>,
        cache: Arc<ResolvedValueCache>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            exclusive: ReentrantMutex::new(()),
            table,
            subscriptions,
            cache,
            notifier,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Attach a metrics collector.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: ReloadMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Hold off publishing until the guard is dropped.
    ///
    /// Bindings take this while resolving their initial value so a concurrent
    /// batch cannot be overwritten by an older resolution.
    pub(crate) fn exclusive(&self) -> ReentrantMutexGuard<'_, ()> {
        self.exclusive.lock()
    }

    /// Publish the changes caused by `batch`. Returns the number of notifications posted.
    pub fn publish(&self, batch: &PropertyBatch) -> usize {
        let _exclusive = self.exclusive.lock();
        let updated = self.table.update_known(batch);
        if !updated.is_empty() {
            debug!(keys = ?updated, "Updated properties from reload");
        }

        let mut published = 0;
        for key in self.subscriptions.keys() {
            let resolved = match self.table.resolve(&key) {
                Ok(resolved) => resolved,
                Err(ReloadError::Resolution { placeholder, .. }) => {
                    warn!(key = %key, placeholder = %placeholder, "Unable to resolve subscription after reload");
                    #[cfg(feature = "metrics")]
                    if let Some(metrics) = &self.metrics {
                        metrics.record_resolution_failure();
                    }
                    continue;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Unable to resolve subscription after reload");
                    continue;
                }
            };

            if let Some(old_value) = self.cache.replace_if_changed(&key, &resolved) {
                info!(
                    key = %key,
                    old_value = old_value.as_deref().unwrap_or(""),
                    new_value = %resolved,
                    "Publish property changes"
                );
                self.notifier
                    .post(&ChangeEvent::new(key, old_value, resolved));
                published += 1;
            }
        }
        published
    }
}

impl BatchHandler for ChangePublisher {
    fn on_batch(&self, path: &str, batch: PropertyBatch) -> Result<()> {
        debug!(path, properties = batch.len(), "Received property batch");

        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(|m| m.start_publish(path));

        let published = self.publish(&batch);

        #[cfg(feature = "metrics")]
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            metrics.record_publish(timer, published);
        }

        debug!(path, published, "Finished publishing property batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Fixture {
        table: Arc<PropertyTable>,
        subscriptions: Arc<SubscriptionRegistry>,
        cache: Arc<ResolvedValueCache>,
        events: Arc<Mutex<Vec<ChangeEvent>>>,
        publisher: ChangePublisher,
    }

    fn fixture() -> Fixture {
        let table = Arc::new(PropertyTable::new());
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let cache = Arc::new(ResolvedValueCache::new());
        let notifier = Arc::new(ChangeNotifier::new());
        let events = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&events);
        notifier.register_fn(move |event| {
            sink.lock().push(event.clone());
            Ok(())
        });

        let publisher = ChangePublisher::new(
            Arc::clone(&table),
            Arc::clone(&subscriptions),
            Arc::clone(&cache),
            notifier,
        );
        Fixture {
            table,
            subscriptions,
            cache,
            events,
            publisher,
        }
    }

    fn subscribe(fixture: &Fixture, expression: &str) {
        use crate::core::{DefaultConversion, Reloadable, SlotBinding};
        use crate::notify::TargetBinding;

        let slot = Reloadable::new(expression, String::new());
        fixture.subscriptions.subscribe(
            expression,
            TargetBinding::new(Arc::new(SlotBinding::new(slot, DefaultConversion))),
        );
        if let Ok(resolved) = fixture.table.resolve(expression) {
            fixture.cache.record(expression, resolved);
        }
    }

    fn batch(pairs: &[(&str, &str)]) -> PropertyBatch {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_dependency_change_republishes_expression() {
        let f = fixture();
        f.table.set("base", "World");
        subscribe(&f, "Hello, ${base}!");

        assert_eq!(f.publisher.publish(&batch(&[("base", "Universe")])), 1);

        let events = f.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key(), "Hello, ${base}!");
        assert_eq!(events[0].old_value(), Some("Hello, World!"));
        assert_eq!(events[0].new_value(), "Hello, Universe!");
    }

    #[test]
    fn test_unchanged_batch_is_silent() {
        let f = fixture();
        f.table.set("a", "1");
        subscribe(&f, "${a}");

        assert_eq!(f.publisher.publish(&batch(&[("a", "1")])), 0);
        assert!(f.events.lock().is_empty());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let f = fixture();
        f.table.set("a", "1");
        subscribe(&f, "${a}");

        f.publisher.publish(&batch(&[("brand_new", "x")]));

        assert!(!f.table.contains("brand_new"));
        assert!(f.events.lock().is_empty());
    }

    #[test]
    fn test_at_most_one_event_per_subscription() {
        let f = fixture();
        f.table.set("a", "1");
        f.table.set("b", "2");
        subscribe(&f, "${a}-${b}");

        assert_eq!(f.publisher.publish(&batch(&[("a", "10"), ("b", "20")])), 1);
        assert_eq!(f.events.lock()[0].new_value(), "10-20");
        assert_eq!(f.cache.get("${a}-${b}").as_deref(), Some("10-20"));
    }

    #[test]
    fn test_unresolvable_subscription_is_skipped() {
        let f = fixture();
        f.table.set("a", "1");
        subscribe(&f, "${a}");
        f.subscriptions.subscribe(
            "${missing}",
            crate::notify::TargetBinding::new(Arc::new(crate::core::SlotBinding::new(
                crate::core::Reloadable::new("missing", String::new()),
                crate::core::DefaultConversion,
            ))),
        );

        assert_eq!(f.publisher.publish(&batch(&[("a", "2")])), 1);
        assert_eq!(f.events.lock()[0].key(), "${a}");
    }

    #[test]
    fn test_concurrent_batches_leave_cache_current() {
        for _ in 0..50 {
            let f = Arc::new(fixture());
            f.table.set("a", "0");
            f.table.set("b", "0");
            subscribe(&f, "${a}-${b}");

            let writers: Vec<_> = ["a", "b"]
                .into_iter()
                .map(|key| {
                    let f = Arc::clone(&f);
                    std::thread::spawn(move || {
                        for i in 1..=50 {
                            let value = i.to_string();
                            f.publisher
                                .on_batch("/app", batch(&[(key, value.as_str())]))
                                .unwrap();
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            let expected = f.table.resolve("${a}-${b}").unwrap();
            assert_eq!(expected, "50-50");
            assert_eq!(f.cache.get("${a}-${b}"), Some(expected.clone()));
            assert_eq!(
                f.events.lock().last().map(|e| e.new_value().to_string()),
                Some(expected)
            );
        }
    }

    #[test]
    fn test_first_resolution_has_no_old_value() {
        let f = fixture();
        f.table.set("a", "1");
        f.subscriptions.subscribe(
            "${a}",
            crate::notify::TargetBinding::new(Arc::new(crate::core::SlotBinding::new(
                crate::core::Reloadable::new("a", String::new()),
                crate::core::DefaultConversion,
            ))),
        );

        f.publisher.on_batch("/app", batch(&[])).unwrap();

        let events = f.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_value(), None);
        assert_eq!(events[0].new_value(), "1");
    }
}
