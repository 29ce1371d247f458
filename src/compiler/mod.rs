//! SIGMA rule compiler.
//!
//! Turns rule documents into executable [`StatelessRule`]s. The work is split
//! across three layers:
//! - [`leaf`] - single field-equals-value tests
//! - [`condition`] - AND/OR/NOT trees and value expansions
//! - [`RuleParser`] - grammar front end, aggregation checks and metadata
//!
//! # Examples
//!
//! ```rust
//! use sigma_rule_engine::compiler::RuleParser;
//! use sigma_rule_engine::event::JsonDatum;
//! use sigma_rule_engine::matcher::always_true;
//! use sigma_rule_engine::rule::Rule;
//! use std::collections::HashMap;
//!
//! let rule_yaml = r#"
//! title: Lambda Function Created
//! id: lambda-create
//! level: medium
//! logsource:
//!     service: cloudtrail
//! detection:
//!     selection:
//!         eventName: CreateFunction
//!     condition: selection
//! "#;
//!
//! let parser = RuleParser::default();
//! let parsed = parser.parse_rule(rule_yaml, always_true(), &HashMap::new())?;
//! let rule = &parsed.stateless_rules[0];
//!
//! let datum = JsonDatum::new(serde_json::json!({"eventName": "CreateFunction"}));
//! assert!(rule.is_match(&datum)?);
//! assert_eq!(rule.rule_metadata().tags, vec!["medium", "cloudtrail"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod condition;
pub mod leaf;

pub use condition::ConditionCompiler;
pub use leaf::LeafCompiler;

use crate::error::{RuleError, RuleParseError, UnsupportedOperation};
use crate::grammar::{RuleGrammar, SigmaRule, SigmaYamlGrammar};
use crate::matcher::{DatumPredicate, FieldAccessor};
use crate::rule::{ParsedRules, RoutingMetadata, RuleData, SigmaRuleMetadata, StatelessRule};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds executable rules from rule documents.
///
/// One parser compiles a whole rule set, so every rule it produces reads
/// fields through the same translation mapping.
#[derive(Clone)]
pub struct RuleParser {
    grammar: Arc<dyn RuleGrammar>,
    conditions: ConditionCompiler,
}

impl RuleParser {
    pub fn new(accessor: FieldAccessor) -> Self {
        Self {
            grammar: Arc::new(SigmaYamlGrammar),
            conditions: ConditionCompiler::new(accessor),
        }
    }

    pub fn with_field_translations(translations: HashMap<String, String>) -> Self {
        Self::new(FieldAccessor::new(translations))
    }

    /// Replace the rule grammar used to read documents.
    pub fn with_grammar(mut self, grammar: Arc<dyn RuleGrammar>) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn grammar(&self) -> &Arc<dyn RuleGrammar> {
        &self.grammar
    }

    pub fn condition_compiler(&self) -> &ConditionCompiler {
        &self.conditions
    }

    pub fn parse_rules(&self, data: &RuleData) -> Result<ParsedRules, RuleError> {
        self.parse_rule(
            &data.rule_text,
            Arc::clone(&data.evaluation_condition),
            &data.metadata,
        )
    }

    /// Parse one rule document into a single stateless rule.
    ///
    /// # Errors
    ///
    /// - [`RuleError::Parse`] when the document or any condition block is
    ///   malformed, or when it declares more than one aggregation
    /// - [`RuleError::Unsupported`] for aggregation rules and keyword searches
    pub fn parse_rule(
        &self,
        rule_text: &str,
        evaluation_condition: DatumPredicate,
        metadata: &HashMap<String, String>,
    ) -> Result<ParsedRules, RuleError> {
        let rule = self
            .grammar
            .parse(rule_text)
            .map_err(|e| RuleParseError::new(format!("Unable to parse rule: {e}")))?;

        info!("Parsing rule with ID {}", rule.id);

        let mut items = Vec::with_capacity(rule.detection.conditions.len());
        let mut aggregations = Vec::new();
        for block in rule.detection.parsed_conditions() {
            let (item, aggregation) = block.map_err(|e| {
                RuleParseError::for_rule(
                    &rule.id,
                    format!("Exception parsing rule with ID: {}: {e}", rule.id),
                )
            })?;
            items.push(item);
            aggregations.extend(aggregation);
        }

        match aggregations.len() {
            0 => {}
            1 => {
                return Err(
                    UnsupportedOperation::new("Aggregate rules are not yet supported").into(),
                )
            }
            n => {
                return Err(RuleParseError::for_rule(
                    &rule.id,
                    format!("Expected 0 or 1 aggregations. Found {n}"),
                )
                .into())
            }
        }

        let rule_condition = self
            .conditions
            .parse_rule_condition(&items)
            .map_err(|e| e.with_rule_id(&rule.id))?;

        let stateless_rule = StatelessRule::new(
            rule.id.clone(),
            evaluation_condition,
            rule_condition,
            RoutingMetadata::from_map(metadata),
            rule_metadata(&rule),
        );
        debug!("Compiled rule {} from {} condition block(s)", rule.id, items.len());

        Ok(ParsedRules {
            stateless_rules: vec![Arc::new(stateless_rule)],
            stateful_rules: Vec::new(),
        })
    }
}

impl Default for RuleParser {
    fn default() -> Self {
        Self::new(FieldAccessor::default())
    }
}

impl fmt::Debug for RuleParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleParser")
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

fn rule_metadata(rule: &SigmaRule) -> SigmaRuleMetadata {
    let mut tags = Vec::with_capacity(rule.tags.len() + 2);
    tags.push(rule.level.to_string());
    tags.push(rule.logsource.service.clone().unwrap_or_default());
    tags.extend(rule.tags.iter().map(ToString::to_string));

    SigmaRuleMetadata {
        title: rule.title.clone(),
        tags,
    }
}
