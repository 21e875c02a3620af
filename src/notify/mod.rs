//! Change notification: events, the listener bus, subscriptions and slot binding.

mod binder;
#[cfg(feature = "async-events")]
mod broadcast;
mod event;
mod notifier;
mod subscription;

pub use binder::ValueBinder;
#[cfg(feature = "async-events")]
pub use broadcast::{BroadcastListener, DEFAULT_EVENT_CAPACITY};
pub use event::ChangeEvent;
pub use notifier::{ChangeListener, ChangeNotifier, ListenerId};
pub use subscription::{BindingTarget, SubscriptionRegistry, TargetBinding};
