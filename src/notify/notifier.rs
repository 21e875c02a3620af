//! In-memory publish/subscribe bus for change events.

use super::ChangeEvent;
use crate::error::Result;
use parking_lot::{ReentrantMutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};

/// Receives change events posted to a [`ChangeNotifier`].
pub trait ChangeListener: Send + Sync {
    /// Handle one change event.
    ///
    /// # Errors
    ///
    /// An error is logged by the notifier and does not affect other listeners.
    fn on_change(&self, event: &ChangeEvent) -> Result<()>;

    /// Get a human-readable name for this listener (for logging/debugging).
    fn name(&self) -> &str {
        "listener"
    }
}

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct FnListener<F> {
    callback: F,
}

impl<F> ChangeListener for FnListener<F>
where
    F: Fn(&ChangeEvent) -> Result<()> + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) -> Result<()> {
        (self.callback)(event)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Bus delivering [`ChangeEvent`]s to registered listeners.
///
/// Delivery is synchronous: [`ChangeNotifier::post`] returns after every listener
/// registered at the time of the call has seen the event, and one `post` completes
/// before the next one begins. A listener that fails or panics is logged and
/// skipped; the remaining listeners still receive the event.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::notify::{ChangeEvent, ChangeNotifier};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let notifier = ChangeNotifier::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let seen_clone = Arc::clone(&seen);
/// let id = notifier.register_fn(move |_event: &ChangeEvent| {
///     seen_clone.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// });
///
/// notifier.post(&ChangeEvent::new("${port}", None, "8080"));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
///
/// notifier.unregister(id);
/// ```
pub struct ChangeNotifier {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn ChangeListener>)>>,
    next_id: AtomicU64,
    dispatch: ReentrantMutex<()>,
}

impl ChangeNotifier {
    /// Create a notifier with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            dispatch: ReentrantMutex::new(()),
        }
    }

    /// Register a listener.
    pub fn register(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(listener = listener.name(), "Registering change listener");
        self.listeners.write().push((id, listener));
        id
    }

    /// Register a closure as a listener.
    pub fn register_fn<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnListener { callback }))
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    /// Deliver `event` to every registered listener.
    ///
    /// Returns the number of listeners that handled the event without error.
    pub fn post(&self, event: &ChangeEvent) -> usize {
        let _dispatch = self.dispatch.lock();
        let listeners: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        let mut delivered = 0;
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_change(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => error!(
                    listener = listener.name(),
                    key = event.key(),
                    error = %e,
                    "Change listener failed"
                ),
                Err(_) => error!(
                    listener = listener.name(),
                    key = event.key(),
                    "Change listener panicked"
                ),
            }
        }
        delivered
    }

    /// Get the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
