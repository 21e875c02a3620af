//! Property change events.

use std::fmt;

/// A resolved property value changed.
///
/// `key` is the subscription key (the placeholder expression as bound), not a raw
/// table key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    key: String,
    old_value: Option<String>,
    new_value: String,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(key: impl Into<String>, old_value: Option<String>, new_value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            old_value,
            new_value: new_value.into(),
        }
    }

    /// The subscription key that changed.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The previously delivered value, if any.
    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    /// The newly resolved value.
    pub fn new_value(&self) -> &str {
        &self.new_value
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_value {
            Some(old) => write!(f, "{}: [{}] -> [{}]", self.key, old, self.new_value),
            None => write!(f, "{}: -> [{}]", self.key, self.new_value),
        }
    }
}
