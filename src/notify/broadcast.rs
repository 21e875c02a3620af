//! Async change stream backed by a tokio broadcast channel.

use super::{ChangeEvent, ChangeListener};
use crate::error::Result;
use tokio::sync::broadcast;

/// Default broadcast channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Listener forwarding every change event to async receivers.
///
/// Receivers that fall more than the channel capacity behind observe
/// [`broadcast::error::RecvError::Lagged`] and skip the oldest events.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_props::notify::{BroadcastListener, ChangeNotifier};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let notifier = ChangeNotifier::new();
/// let listener = Arc::new(BroadcastListener::new(16));
/// let mut rx = listener.subscribe();
/// notifier.register(listener);
///
/// while let Ok(event) = rx.recv().await {
///     println!("{} changed to {}", event.key(), event.new_value());
/// }
/// # }
/// ```
pub struct BroadcastListener {
    events: broadcast::Sender<ChangeEvent>,
}

impl BroadcastListener {
    /// Create a listener with the given channel capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            events: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Open a new receiver for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}

impl Default for BroadcastListener {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl ChangeListener for BroadcastListener {
    fn on_change(&self, event: &ChangeEvent) -> Result<()> {
        // No receivers is not an error.
        let _ = self.events.send(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "broadcast"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeNotifier;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_events_reach_receiver() {
        let notifier = ChangeNotifier::new();
        let listener = Arc::new(BroadcastListener::default());
        let mut rx = listener.subscribe();
        notifier.register(listener);

        notifier.post(&ChangeEvent::new("${a}", None, "1"));
        notifier.post(&ChangeEvent::new("${a}", Some("1".to_string()), "2"));

        assert_eq!(rx.recv().await.unwrap().new_value(), "1");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.old_value(), Some("1"));
        assert_eq!(second.new_value(), "2");
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let listener = BroadcastListener::new(0);
        let mut rx = listener.subscribe();

        listener
            .on_change(&ChangeEvent::new("${a}", None, "1"))
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().new_value(), "1");
    }

    #[test]
    fn test_no_receivers_is_ok() {
        let listener = BroadcastListener::new(4);
        assert!(listener.on_change(&ChangeEvent::new("${a}", None, "1")).is_ok());
    }
}
