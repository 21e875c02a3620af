//! Conversion strategies from resolved strings to typed slot values.

use std::any::TypeId;
use std::fmt::Display;
use std::str::FromStr;

/// Converts a resolved property string into the value stored in a bound slot.
///
/// Implement this trait to plug in a custom conversion, or wrap a closure in
/// [`CustomConversion`].
pub trait PropertyConversion<T>: Send + Sync {
    /// Convert `raw` into a `T`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `raw` cannot be converted.
    fn convert(&self, raw: &str) -> Result<T, String>;
}

/// Scalar conversion through [`FromStr`] (`bool`, integers, floats, `String`, ...).
///
/// A value that does not parse as-is is retried with surrounding whitespace
/// trimmed, so `8080 ` converts to a number. Booleans go through
/// [`BoolConversion`] and accept its aliases.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::{DefaultConversion, PropertyConversion};
///
/// let port: u16 = DefaultConversion.convert("8080 ").unwrap();
/// assert_eq!(port, 8080);
/// let enabled: bool = DefaultConversion.convert("yes").unwrap();
/// assert!(enabled);
/// assert!(PropertyConversion::<bool>::convert(&DefaultConversion, "maybe").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConversion;

impl<T> PropertyConversion<T> for DefaultConversion
where
    T: FromStr + 'static,
    T::Err: Display,
{
    fn convert(&self, raw: &str) -> Result<T, String> {
        if TypeId::of::<T>() == TypeId::of::<bool>() {
            let flag = BoolConversion.convert(raw)?;
            return flag.to_string().parse::<T>().map_err(|e| e.to_string());
        }

        match raw.parse::<T>() {
            Ok(value) => Ok(value),
            Err(e) => {
                let trimmed = raw.trim();
                if trimmed.len() == raw.len() {
                    return Err(e.to_string());
                }
                trimmed.parse::<T>().map_err(|e| e.to_string())
            }
        }
    }
}

/// Boolean conversion accepting `true/false`, `yes/no`, `on/off` and `1/0`.
///
/// Matching ignores case and surrounding whitespace.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::{BoolConversion, PropertyConversion};
///
/// assert!(BoolConversion.convert("ON").unwrap());
/// assert!(!BoolConversion.convert(" 0").unwrap());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConversion;

impl PropertyConversion<bool> for BoolConversion {
    fn convert(&self, raw: &str) -> Result<bool, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(format!("invalid boolean value '{}'", raw)),
        }
    }
}

/// Splits a value on `;` into an ordered list of strings.
///
/// Segments are not trimmed and `;` cannot be escaped. Trailing empty segments
/// are dropped, and a value without any `;` yields a single element.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::{ListConversion, PropertyConversion};
///
/// let list = ListConversion.convert("Value1;Value2;Value3").unwrap();
/// assert_eq!(list, vec!["Value1", "Value2", "Value3"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ListConversion;

/// List element separator.
pub const LIST_SEPARATOR: char = ';';

impl PropertyConversion<Vec<String>> for ListConversion {
    fn convert(&self, raw: &str) -> Result<Vec<String>, String> {
        if !raw.contains(LIST_SEPARATOR) {
            return Ok(vec![raw.to_string()]);
        }
        let mut items: Vec<String> = raw.split(LIST_SEPARATOR).map(str::to_string).collect();
        while items.last().is_some_and(String::is_empty) {
            items.pop();
        }
        Ok(items)
    }
}

/// A conversion backed by a closure.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::{CustomConversion, PropertyConversion};
/// use std::time::Duration;
///
/// let millis = CustomConversion::new(|raw: &str| {
///     raw.parse::<u64>()
///         .map(Duration::from_millis)
///         .map_err(|e| e.to_string())
/// });
/// assert_eq!(millis.convert("250").unwrap(), Duration::from_millis(250));
/// ```
pub struct CustomConversion<F> {
    convert: F,
}

impl<F> CustomConversion<F> {
    /// Wrap a conversion closure.
    pub fn new(convert: F) -> Self {
        Self { convert }
    }
}

impl<T, F> PropertyConversion<T> for CustomConversion<F>
where
    F: Fn(&str) -> Result<T, String> + Send + Sync,
{
    fn convert(&self, raw: &str) -> Result<T, String> {
        (self.convert)(raw)
    }
}
