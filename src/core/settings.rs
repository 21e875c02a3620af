//! Declarative source settings.

use super::Validate;
use crate::error::{ReloadError, Result};
use crate::sources::Encoding;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "HOTSWAP_PROPS";

/// Separator for nested keys in environment overrides.
pub const ENV_SEPARATOR: &str = "__";

/// One watched source: a store location and the paths read from it.
///
/// # Examples
///
/// ```rust
/// use hotswap_props::core::ReloadSource;
///
/// let source = ReloadSource::new("zk1:2181,zk2:2181")
///     .with_credential("app:secret")
///     .with_path("/app/common.properties")
///     .with_path("/app/service.properties")
///     .ignore_resource_not_found(true);
/// assert_eq!(source.paths.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadSource {
    /// Store location passed to the connector
    pub location: String,

    /// Opaque credential passed to the store client unchanged
    #[serde(default)]
    pub credential: Option<String>,

    /// Paths read in declaration order; later paths win for duplicate keys
    pub paths: Vec<String>,

    /// Skip paths that do not exist instead of failing
    #[serde(default)]
    pub ignore_resource_not_found: bool,

    /// Payload encoding label, UTF-8 when absent
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ReloadSource {
    /// Create a source for `location` with no paths.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            credential: None,
            paths: Vec::new(),
            ignore_resource_not_found: false,
            encoding: None,
        }
    }

    /// Set the credential.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Append a path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Skip missing paths instead of failing.
    pub fn ignore_resource_not_found(mut self, ignore: bool) -> Self {
        self.ignore_resource_not_found = ignore;
        self
    }

    /// Set the payload encoding label (e.g. `"ISO-8859-1"`).
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// The declared encoding.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Configuration`] for unsupported labels.
    pub fn resolved_encoding(&self) -> Result<Encoding> {
        self.encoding
            .as_deref()
            .map_or(Ok(Encoding::Utf8), Encoding::from_label)
    }
}

impl Validate for ReloadSource {
    fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(ReloadError::Configuration(
                "Source location must not be blank".to_string(),
            ));
        }
        if self.paths.is_empty() {
            return Err(ReloadError::Configuration(format!(
                "Source '{}' declares no paths",
                self.location
            )));
        }
        self.resolved_encoding()?;
        Ok(())
    }
}

/// Engine settings loaded from a file.
///
/// ```yaml
/// sources:
///   - location: "zk1:2181"
///     credential: "app:secret"
///     paths: ["/app/service.properties"]
///     ignore_resource_not_found: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Declared sources
    #[serde(default)]
    pub sources: Vec<ReloadSource>,
}

impl EngineSettings {
    /// Load settings from a YAML, TOML or JSON file.
    ///
    /// Environment variables prefixed with `HOTSWAP_PROPS` (nested keys separated
    /// by `__`) override file values.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Settings`] if the file cannot be read or deserialized.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading engine settings");

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()?;

        settings.try_deserialize::<Self>().map_err(|e| {
            ReloadError::Settings(format!(
                "Failed to deserialize settings from {}: {}",
                path.display(),
                e
            ))
        })
    }
}

impl Validate for EngineSettings {
    fn validate(&self) -> Result<()> {
        self.sources.iter().try_for_each(Validate::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builder_methods() {
        let source = ReloadSource::new("zk:2181")
            .with_credential("u:p")
            .with_path("/a")
            .with_encoding("ISO-8859-1");

        assert_eq!(source.credential.as_deref(), Some("u:p"));
        assert_eq!(source.paths, vec!["/a".to_string()]);
        assert_eq!(source.resolved_encoding().unwrap(), Encoding::Latin1);
        assert!(source.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        assert!(ReloadSource::new("  ").with_path("/a").validate().is_err());
        assert!(ReloadSource::new("zk:2181").validate().is_err());
        assert!(
            ReloadSource::new("zk:2181")
                .with_path("/a")
                .with_encoding("EBCDIC")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_load_yaml_settings() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.yaml");
        fs::write(
            &file,
            r#"
sources:
  - location: "zk:2181"
    credential: "u:p"
    paths: ["/a", "/b"]
    ignore_resource_not_found: true
  - location: "zk:2182"
    paths: ["/c"]
    encoding: "ISO-8859-1"
"#,
        )
        .unwrap();

        let settings = EngineSettings::from_file(&file).unwrap();
        assert_eq!(settings.sources.len(), 2);
        assert_eq!(settings.sources[0].paths, vec!["/a", "/b"]);
        assert!(settings.sources[0].ignore_resource_not_found);
        assert!(!settings.sources[1].ignore_resource_not_found);
        assert_eq!(settings.sources[1].credential, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_toml_settings() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.toml");
        fs::write(
            &file,
            r#"
[[sources]]
location = "zk:2181"
paths = ["/app"]
"#,
        )
        .unwrap();

        let settings = EngineSettings::from_file(&file).unwrap();
        assert_eq!(settings.sources[0].location, "zk:2181");
    }

    #[test]
    fn test_missing_settings_file() {
        let result = EngineSettings::from_file("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ReloadError::Settings(_))));
    }
}
