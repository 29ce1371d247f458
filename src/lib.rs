//! # SIGMA Rule Engine
//!
//! A Rust library that compiles [SIGMA detection rules](https://github.com/SigmaHQ/sigma)
//! into predicate closures and evaluates batches of events against them.
//!
//! Rules are compiled once: regex patterns, CIDR blocks and comparison
//! thresholds are prepared up front and every condition node becomes a
//! shared closure. The compiled set is published to a [`RuleStore`] and read
//! by evaluators as an immutable snapshot.
//!
//! ## Quick Start
//!
//! ```rust
//! use sigma_rule_engine::{
//!     predicate, CloudTrailEvent, Datum, InMemoryRuleStore, RuleEvaluator, RuleParser,
//!     RuleStore, StatelessRuleEvaluator,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let rule_yaml = r#"
//! title: Lambda Function Created
//! id: 7b1c2d3e-lambda-create
//! logsource:
//!     product: aws
//!     service: cloudtrail
//! detection:
//!     selection:
//!         eventName: CreateFunction
//!     condition: selection
//! "#;
//!
//! // Only CloudTrail records are worth evaluating for this rule
//! let is_cloudtrail = predicate(|datum| datum.as_any().is::<CloudTrailEvent>());
//!
//! let parsed = RuleParser::default().parse_rule(rule_yaml, is_cloudtrail, &HashMap::new())?;
//! let store = Arc::new(InMemoryRuleStore::new());
//! store.update_stateless_rules(parsed.stateless_rules);
//!
//! let evaluator = StatelessRuleEvaluator::new(store);
//! let events: Vec<Arc<dyn Datum>> = vec![
//!     Arc::new(CloudTrailEvent::new("CreateFunction", 1_700_000_000)),
//!     Arc::new(CloudTrailEvent::new("DeleteFunction", 1_700_000_001)),
//! ];
//!
//! let matches = evaluator.evaluate(&events)?;
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].rule_ids(), vec!["7b1c2d3e-lambda-create"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Field Translation
//!
//! ```rust
//! use sigma_rule_engine::{always_true, EngineConfig, JsonDatum, Rule};
//! use std::collections::HashMap;
//!
//! // Rules say `Image`, events store `process.executable`
//! let config = EngineConfig::new().with_field_translation("Image", "process.executable");
//! let parser = config.rule_parser();
//!
//! let rule_yaml = r#"
//! id: shell
//! detection:
//!     selection:
//!         Image|re: '/(ba|z)?sh$'
//!     condition: selection
//! "#;
//! let parsed = parser.parse_rule(rule_yaml, always_true(), &HashMap::new())?;
//!
//! let event = JsonDatum::new(serde_json::json!({"process": {"executable": "/bin/bash"}}));
//! assert!(parsed.stateless_rules[0].is_match(&event)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Bulk Import
//!
//! ```rust
//! use sigma_rule_engine::{always_true, ImportConfig, InMemoryRuleStore, RuleData, RuleImporter, RuleParser, RuleStore};
//!
//! let documents = vec![
//!     RuleData::new("id: a\ndetection:\n  s: {eventName: Login}\n  condition: s\n", always_true()),
//!     RuleData::new("id: b\ndetection:\n  s: {eventName: Login}\n  condition: s | count() > 5\n", always_true()),
//! ];
//!
//! let importer = RuleImporter::new(RuleParser::default(), ImportConfig::default());
//! let report = importer.import(&documents)?;
//! assert_eq!(report.imported(), 1);
//! assert_eq!(report.skipped.len(), 1);
//!
//! let store = InMemoryRuleStore::new();
//! report.publish(&store);
//! assert_eq!(store.stateless_rules().len(), 1);
//! # Ok::<(), sigma_rule_engine::RuleError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod grammar;
pub mod import;
pub mod matcher;
pub mod rule;
pub mod store;

// Compiler and configuration
pub use compiler::{ConditionCompiler, LeafCompiler, RuleParser};
pub use config::{EngineConfig, ImportConfig};

// Core types and errors
pub use error::{
    ConfigError, FieldCastError, GrammarError, Result, RuleError, RuleParseError,
    UnsupportedOperation,
};
pub use event::{CloudTrailEvent, Datum, FieldValue, JsonDatum};
pub use rule::{
    ParsedRules, RoutingMetadata, Rule, RuleData, SigmaRuleMetadata, StatefulRule, StatelessRule,
};

// Grammar front end
pub use grammar::{RuleGrammar, SigmaRule, SigmaYamlGrammar};

// Matcher system
pub use matcher::{always_false, always_true, predicate, DatumPredicate, FieldAccessor};

// Storage and evaluation
pub use evaluator::{Match, RuleEvaluator, StatelessRuleEvaluator};
pub use import::{ImportFailure, ImportReport, RuleImporter};
pub use store::{InMemoryRuleStore, RuleStore};
