//! Error types for hotswap-props.

use crate::sources::StoreError;

/// Result type alias for hotswap-props operations.
pub type Result<T> = std::result::Result<T, ReloadError>;

/// Errors that can occur while loading, resolving or reloading bound properties.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// A source declaration is invalid (blank location, no paths, unknown encoding).
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Reading a declared path from the coordination store failed.
    #[error("Failed to resolve configuration resource [{path}]: {source}")]
    Resource {
        /// The store path that could not be read
        path: String,
        /// The underlying store failure
        #[source]
        source: StoreError,
    },

    /// A placeholder had no value and no default.
    #[error("Could not resolve placeholder '{placeholder}' in value \"{expression}\"")]
    Resolution {
        /// Name of the unresolved placeholder
        placeholder: String,
        /// The expression being resolved
        expression: String,
    },

    /// A resolved value could not be converted for its target slot.
    #[error(
        "Unable to convert property for target [{target}]. Value [{value}] cannot be converted to [{target_type}]: {reason}"
    )]
    Conversion {
        /// Name of the bound target
        target: String,
        /// The raw resolved value
        value: String,
        /// Rust type name of the target
        target_type: &'static str,
        /// Why the conversion failed
        reason: String,
    },

    /// A watched payload could not be decoded.
    #[error("Failed to parse properties payload: {0}")]
    Parse(String),

    /// The coordination store reported an error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The settings file could not be loaded.
    #[error("Failed to load settings: {0}")]
    Settings(String),

    /// Several independent failures occurred while handling one change.
    #[error("{} errors occurred: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<ReloadError>),
}

impl ReloadError {
    /// Create a conversion error for the given target and value.
    pub fn conversion(
        target: impl Into<String>,
        value: impl Into<String>,
        target_type: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            target: target.into(),
            value: value.into(),
            target_type,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error came from a path that does not exist in the store.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Resource { source, .. } | Self::Store(source) => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<config::ConfigError> for ReloadError {
    fn from(err: config::ConfigError) -> Self {
        ReloadError::Settings(err.to_string())
    }
}

fn join_errors(errors: &[ReloadError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = ReloadError::Resource {
            path: "/app/props".to_string(),
            source: StoreError::NotFound {
                path: "/app/props".to_string(),
            },
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/app/props"));

        let err = ReloadError::Configuration("blank".to_string());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_multiple_display() {
        let err = ReloadError::Multiple(vec![
            ReloadError::conversion("port", "abc", "u16", "invalid digit"),
            ReloadError::Parse("bad".to_string()),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("2 errors occurred"));
        assert!(text.contains("[port]"));
        assert!(text.contains("bad"));
    }
}
