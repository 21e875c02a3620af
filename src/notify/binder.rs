//! Listener writing changed values into bound slots.

use super::{ChangeEvent, ChangeListener, SubscriptionRegistry};
use crate::error::{ReloadError, Result};
use std::sync::Arc;
use tracing::{error, info};

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// Applies change events to every slot bound to the changed subscription key.
///
/// A conversion failure leaves that slot at its last good value, is logged with
/// the key, value and target, and does not stop the remaining slots from updating.
pub struct ValueBinder {
    subscriptions: Arc<SubscriptionRegistry>,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl ValueBinder {
    /// Create a binder reading bindings from `subscriptions`.
    pub fn new(subscriptions: Arc<SubscriptionRegistry>) -> Self {
        Self {
            subscriptions,
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
}

impl ChangeListener for ValueBinder {
    fn on_change(&self, event: &ChangeEvent) -> Result<()> {
        let mut failures = Vec::new();

        for binding in self.subscriptions.bindings_for(event.key()) {
            match binding.apply(event.new_value()) {
                Ok(()) => info!(
                    key = event.key(),
                    target = binding.name(),
                    value = event.new_value(),
                    "Reloaded property on target"
                ),
                Err(e) => {
                    error!(
                        key = event.key(),
                        target = binding.name(),
                        value = event.new_value(),
                        error = %e,
                        "Unable to reload property on target"
                    );
                    failures.push(e);
                }
            }
        }

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            if !failures.is_empty() {
                metrics.record_conversion_failures(failures.len());
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(ReloadError::Multiple(failures)),
        }
    }

    fn name(&self) -> &str {
        "value-binder"
    }
}
