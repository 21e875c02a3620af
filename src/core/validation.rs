//! Declaration validation support.

use crate::error::Result;

/// Trait for validating a declaration before it takes effect.
///
/// The engine validates every [`ReloadSource`](crate::core::ReloadSource) before
/// reading or watching anything, so an invalid declaration never leaves a
/// partially started source behind.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::Validate;
/// use hotswap_props::error::{ReloadError, Result};
///
/// struct Timeouts {
///     connect_ms: u64,
/// }
///
/// impl Validate for Timeouts {
///     fn validate(&self) -> Result<()> {
///         if self.connect_ms == 0 {
///             return Err(ReloadError::Configuration(
///                 "connect_ms must be greater than 0".to_string(),
///             ));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(Timeouts { connect_ms: 0 }.validate().is_err());
/// ```
pub trait Validate {
    /// Validate the declaration.
    ///
    /// # Errors
    ///
    /// Should return a [`ReloadError::Configuration`](crate::error::ReloadError::Configuration)
    /// describing what is wrong.
    fn validate(&self) -> Result<()>;
}
