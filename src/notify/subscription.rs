//! Registry of bound targets per subscription key.

use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A consumer slot that can receive new values for a subscription.
pub trait BindingTarget: Send + Sync {
    /// Identity of the underlying storage; two bindings with the same id write the same slot.
    fn target_id(&self) -> usize;

    /// Name of the target (for logging/debugging).
    fn target_name(&self) -> &str;

    /// Convert `raw` and write it into the slot.
    ///
    /// # Errors
    ///
    /// Returns a conversion error and leaves the slot unchanged if `raw` cannot be converted.
    fn apply(&self, raw: &str) -> Result<()>;
}

/// One consumer bound to a subscription key.
#[derive(Clone)]
pub struct TargetBinding {
    target: Arc<dyn BindingTarget>,
}

impl TargetBinding {
    /// Wrap a binding target.
    pub fn new(target: Arc<dyn BindingTarget>) -> Self {
        Self { target }
    }

    /// Identity of the bound slot.
    pub fn id(&self) -> usize {
        self.target.target_id()
    }

    /// Name of the bound slot.
    pub fn name(&self) -> &str {
        self.target.target_name()
    }

    /// Convert and assign `raw` to the bound slot.
    pub fn apply(&self, raw: &str) -> Result<()> {
        self.target.apply(raw)
    }
}

impl PartialEq for TargetBinding {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TargetBinding {}

impl fmt::Debug for TargetBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetBinding")
            .field("name", &self.name())
            .field("id", &self.id())
            .finish()
    }
}

/// Mapping from subscription key to the set of bound targets.
///
/// Subscriptions live as long as the registry; the set for a key only grows.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: Mutex<HashMap<String, Vec<TargetBinding>>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `binding` to the set for `expression`.
    ///
    /// Returns `false` if the same slot was already bound to this expression.
    pub fn subscribe(&self, expression: impl Into<String>, binding: TargetBinding) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        let bindings = subscriptions.entry(expression.into()).or_default();
        if bindings.contains(&binding) {
            return false;
        }
        bindings.push(binding);
        true
    }

    /// All subscribed expressions.
    pub fn keys(&self) -> Vec<String> {
        self.subscriptions.lock().keys().cloned().collect()
    }

    /// Bindings for `expression`; empty if nothing is subscribed.
    pub fn bindings_for(&self, expression: &str) -> Vec<TargetBinding> {
        self.subscriptions
            .lock()
            .get(expression)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if `expression` has at least one binding.
    pub fn contains(&self, expression: &str) -> bool {
        self.subscriptions.lock().contains_key(expression)
    }

    /// Number of subscribed expressions.
    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }

    /// Total number of bindings across all expressions.
    pub fn binding_count(&self) -> usize {
        self.subscriptions.lock().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DefaultConversion, Reloadable, SlotBinding};

    fn binding(slot: &Reloadable<String>) -> TargetBinding {
        TargetBinding::new(Arc::new(SlotBinding::new(slot.clone(), DefaultConversion)))
    }

    #[test]
    fn test_subscribe_and_lookup() {
        let registry = SubscriptionRegistry::new();
        let slot = Reloadable::new("name", String::new());

        assert!(registry.subscribe("${name}", binding(&slot)));
        assert_eq!(registry.keys(), vec!["${name}".to_string()]);
        assert_eq!(registry.bindings_for("${name}").len(), 1);
        assert!(registry.bindings_for("${other}").is_empty());
    }

    #[test]
    fn test_duplicate_binding_is_noop() {
        let registry = SubscriptionRegistry::new();
        let slot = Reloadable::new("name", String::new());

        assert!(registry.subscribe("${name}", binding(&slot)));
        assert!(!registry.subscribe("${name}", binding(&slot.clone())));
        assert_eq!(registry.binding_count(), 1);
    }

    #[test]
    fn test_set_grows_with_new_slots() {
        let registry = SubscriptionRegistry::new();
        let first = Reloadable::new("first", String::new());
        let second = Reloadable::new("second", String::new());

        registry.subscribe("${x}", binding(&first));
        registry.subscribe("${x}", binding(&second));
        registry.subscribe("${y}", binding(&first));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.bindings_for("${x}").len(), 2);
        assert_eq!(registry.binding_count(), 3);
    }
}
