//! Error types for the SIGMA rule engine.
//!
//! Compile-time failures come in two kinds that callers are expected to tell
//! apart: [`RuleParseError`] means the rule is malformed, [`UnsupportedOperation`]
//! means the rule uses a feature the engine does not implement yet. Both are
//! carried by [`RuleError`] where an operation can yield either.
//!
//! Evaluation only fails with [`FieldCastError`].

use thiserror::Error;

pub type Result<T, E = RuleError> = std::result::Result<T, E>;

/// A compiled rule met a stored field value of the wrong type.
///
/// This indicates drift between the rule set (or its field translations) and
/// the event schema, not missing data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unable to cast field {field} to type {target}")]
pub struct FieldCastError {
    pub field: String,
    pub target: &'static str,
}

impl FieldCastError {
    pub fn new(field: impl Into<String>, target: &'static str) -> Self {
        Self {
            field: field.into(),
            target,
        }
    }
}

/// A rule document or condition tree is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuleParseError {
    pub message: String,
    pub rule_id: Option<String>,
}

impl RuleParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rule_id: None,
        }
    }

    pub fn for_rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rule_id: Some(rule_id.into()),
        }
    }
}

/// A rule asks for something the engine deliberately does not implement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct UnsupportedOperation(pub String);

impl UnsupportedOperation {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Failure while turning one rule document into executable rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Rule parse error: {0}")]
    Parse(#[from] RuleParseError),
    #[error("Unsupported operation: {0}")]
    Unsupported(#[from] UnsupportedOperation),
}

impl RuleError {
    pub fn parse(message: impl Into<String>) -> Self {
        RuleError::Parse(RuleParseError::new(message))
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        RuleError::Unsupported(UnsupportedOperation::new(message))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, RuleError::Parse(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, RuleError::Unsupported(_))
    }

    /// Attach a rule id to a parse error that does not carry one yet.
    pub fn with_rule_id(self, rule_id: &str) -> Self {
        match self {
            RuleError::Parse(mut error) => {
                if error.rule_id.is_none() {
                    error.rule_id = Some(rule_id.to_string());
                }
                RuleError::Parse(error)
            }
            other => other,
        }
    }

    /// Id of the rule the error was raised for, when known.
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            RuleError::Parse(e) => e.rule_id.as_deref(),
            RuleError::Unsupported(_) => None,
        }
    }
}

/// Errors raised by the rule-grammar front end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("YAML parsing error: {0}")]
    Yaml(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid condition: {0}")]
    Condition(String),
    #[error("Invalid aggregation: {0}")]
    Aggregation(String),
    #[error("Invalid detection '{name}': {message}")]
    Detection { name: String, message: String },
    #[error("Unsupported field modifier '{modifier}' on field '{field}'")]
    UnsupportedModifier { field: String, modifier: String },
}

/// Errors raised while loading engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("YAML parsing error: {0}")]
    Yaml(String),
    #[error("JSON parsing error: {0}")]
    Json(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_field_cast_error_display() {
        let error = FieldCastError::new("eventName", "integer");
        assert_eq!(
            error.to_string(),
            "Unable to cast field eventName to type integer"
        );
        assert!(error.source().is_none());
    }

    #[test]
    fn test_rule_parse_error_carries_rule_id() {
        let error = RuleParseError::for_rule("abc-123", "bad tree");
        assert_eq!(error.rule_id.as_deref(), Some("abc-123"));
        assert_eq!(error.to_string(), "bad tree");

        let error = RuleParseError::new("bad tree");
        assert!(error.rule_id.is_none());
    }

    #[test]
    fn test_rule_error_kinds_are_distinct() {
        let parse = RuleError::parse("Expected 2. Found 1");
        let unsupported = RuleError::unsupported("Keyword lookup is not yet supported");

        assert!(parse.is_parse());
        assert!(!parse.is_unsupported());
        assert!(unsupported.is_unsupported());
        assert!(!unsupported.is_parse());
        assert_ne!(parse, unsupported);
    }

    #[test]
    fn test_rule_error_display() {
        assert_eq!(
            RuleError::parse("no predicates").to_string(),
            "Rule parse error: no predicates"
        );
        assert_eq!(
            RuleError::unsupported("aggregate rules").to_string(),
            "Unsupported operation: aggregate rules"
        );
    }

    #[test]
    fn test_rule_error_from_conversions() {
        let error: RuleError = RuleParseError::for_rule("r1", "boom").into();
        assert_eq!(error.rule_id(), Some("r1"));

        let error: RuleError = UnsupportedOperation::new("later").into();
        assert!(error.rule_id().is_none());
        match error {
            RuleError::Unsupported(inner) => assert_eq!(inner.message(), "later"),
            _ => panic!("Expected Unsupported variant"),
        }
    }

    #[test]
    fn test_rule_error_source_chain() {
        let error: RuleError = RuleParseError::new("inner").into();
        let source = error.source().expect("parse variant exposes its source");
        assert_eq!(source.to_string(), "inner");
    }

    #[test]
    fn test_grammar_error_display() {
        let errors = vec![
            (GrammarError::Yaml("eof".to_string()), "YAML parsing error"),
            (GrammarError::MissingField("id"), "Missing required field: id"),
            (
                GrammarError::Condition("Unexpected token".to_string()),
                "Invalid condition",
            ),
            (
                GrammarError::Aggregation("count".to_string()),
                "Invalid aggregation",
            ),
            (
                GrammarError::Detection {
                    name: "selection".to_string(),
                    message: "empty".to_string(),
                },
                "Invalid detection 'selection'",
            ),
            (
                GrammarError::UnsupportedModifier {
                    field: "Image".to_string(),
                    modifier: "contains".to_string(),
                },
                "Unsupported field modifier 'contains'",
            ),
        ];

        for (error, expected) in errors {
            assert!(error.to_string().contains(expected), "{error}");
        }
    }

    #[test]
    fn test_config_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ConfigError = io_error.into();
        assert!(matches!(error, ConfigError::Io(ref msg) if msg.contains("file not found")));
    }

    #[test]
    fn test_with_rule_id_keeps_existing_id() {
        let error = RuleError::parse("bad").with_rule_id("r1");
        assert_eq!(error.rule_id(), Some("r1"));

        let error = error.with_rule_id("r2");
        assert_eq!(error.rule_id(), Some("r1"));

        let error = RuleError::unsupported("later").with_rule_id("r3");
        assert!(error.rule_id().is_none());
    }
}
