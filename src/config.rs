//! Engine configuration.
//!
//! Configuration covers the two things a deployment tunes: how logical field
//! names used by rules map onto the stored field names of its events, and how
//! bulk rule imports react to rules that cannot be compiled.
//!
//! Configuration can be built in code or loaded from YAML or JSON:
//!
//! ```yaml
//! field_translations:
//!   EventName: eventName
//!   Timestamp: time
//! import:
//!   skip_unsupported: true
//!   fail_fast: false
//! ```

use crate::compiler::RuleParser;
use crate::error::ConfigError;
use crate::matcher::FieldAccessor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Policy for importing many rule documents at once.
///
/// # Examples
///
/// ```rust
/// use sigma_rule_engine::config::ImportConfig;
///
/// let lenient = ImportConfig::default();
/// assert!(lenient.skip_unsupported);
/// assert!(!lenient.fail_fast);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Skip rules that use unsupported features instead of reporting them as failures.
    pub skip_unsupported: bool,
    /// Abort the import at the first failure.
    pub fail_fast: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            skip_unsupported: true,
            fail_fast: false,
        }
    }
}

/// Top-level engine configuration.
///
/// # Example
/// ```rust
/// use sigma_rule_engine::config::EngineConfig;
///
/// let config = EngineConfig::new()
///     .with_field_translation("EventName", "eventName")
///     .with_fail_fast(true);
///
/// assert_eq!(config.field_accessor().translate("EventName"), "eventName");
/// assert!(config.import.fail_fast);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logical field name used by rules mapped to the stored field name.
    pub field_translations: HashMap<String, String>,
    /// Bulk import policy.
    pub import: ImportConfig,
}

impl EngineConfig {
    /// Create a new engine configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that treats every rule that fails to compile as fatal.
    pub fn strict() -> Self {
        Self {
            field_translations: HashMap::new(),
            import: ImportConfig {
                skip_unsupported: false,
                fail_fast: true,
            },
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Load from a file. `.json` files are read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }

    // Builder methods

    /// Add a logical to stored field name translation.
    pub fn with_field_translation(
        mut self,
        logical: impl Into<String>,
        physical: impl Into<String>,
    ) -> Self {
        self.field_translations.insert(logical.into(), physical.into());
        self
    }

    pub fn with_skip_unsupported(mut self, skip: bool) -> Self {
        self.import.skip_unsupported = skip;
        self
    }

    pub fn with_fail_fast(mut self, enable: bool) -> Self {
        self.import.fail_fast = enable;
        self
    }

    /// Field accessor over this configuration's translations.
    pub fn field_accessor(&self) -> FieldAccessor {
        FieldAccessor::new(self.field_translations.clone())
    }

    /// Rule parser whose compiled rules read fields through this configuration's translations.
    pub fn rule_parser(&self) -> RuleParser {
        RuleParser::new(self.field_accessor())
    }
}
