//! Target slots written by the reload engine.

use super::conversion::PropertyConversion;
use crate::error::{ReloadError, Result};
use crate::notify::BindingTarget;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;

/// A value kept in sync with a bound property expression.
///
/// Reads are lock-free and never observe a partially written value: every
/// reload replaces the whole value with a single atomic pointer swap.
/// Clones share the same slot.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::Reloadable;
///
/// let timeout = Reloadable::new("timeout", 30u32);
/// assert_eq!(*timeout.get(), 30);
/// assert_eq!(timeout.name(), "timeout");
/// ```
pub struct Reloadable<T> {
    name: Arc<str>,
    current: Arc<ArcSwap<T>>,
}

impl<T> Reloadable<T> {
    /// Create a slot with a name (used in logs and errors) and an initial value.
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            name: Arc::from(name.into()),
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Get a reference-counted handle to the current value.
    pub fn get(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// The slot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the current value.
    pub(crate) fn store(&self, value: T) {
        self.current.store(Arc::new(value));
    }

    /// Identity shared by all clones of this slot.
    pub(crate) fn slot_id(&self) -> usize {
        Arc::as_ptr(&self.current) as *const () as usize
    }
}

impl<T> Clone for Reloadable<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            current: Arc::clone(&self.current),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Reloadable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reloadable")
            .field("name", &self.name)
            .field("value", &self.get())
            .finish()
    }
}

/// Convert `raw` for `slot`, naming the slot and value on failure.
pub(crate) fn convert_for<T, C>(slot: &Reloadable<T>, conversion: &C, raw: &str) -> Result<T>
where
    C: PropertyConversion<T> + ?Sized,
{
    conversion
        .convert(raw)
        .map_err(|reason| ReloadError::conversion(slot.name(), raw, std::any::type_name::<T>(), reason))
}

/// A slot paired with the conversion chosen when it was bound.
pub(crate) struct SlotBinding<T, C> {
    slot: Reloadable<T>,
    conversion: C,
}

impl<T, C> SlotBinding<T, C> {
    pub(crate) fn new(slot: Reloadable<T>, conversion: C) -> Self {
        Self { slot, conversion }
    }
}

impl<T, C> BindingTarget for SlotBinding<T, C>
where
    T: Send + Sync + 'static,
    C: PropertyConversion<T> + 'static,
{
    fn target_id(&self) -> usize {
        self.slot.slot_id()
    }

    fn target_name(&self) -> &str {
        self.slot.name()
    }

    fn apply(&self, raw: &str) -> Result<()> {
        let value = convert_for(&self.slot, &self.conversion, raw)?;
        self.slot.store(value);
        Ok(())
    }
}
