//! SIGMA rule grammar front end.
//!
//! Turns rule text into a [`SigmaRule`]: descriptive fields plus one or more
//! condition blocks, each lazily resolvable into a [`ConditionItem`] tree and
//! an optional [`AggregationItem`]. The compiler in [`crate::compiler`] only
//! depends on the [`RuleGrammar`] trait, so other rule dialects can be plugged
//! in without touching it.

pub mod ast;
mod condition;
mod detection;

pub use ast::{
    AggregationItem, ConditionArg, ConditionItem, FieldEqualsValue, SigmaCompare, SigmaNumber,
    SigmaValue,
};
pub use detection::DetectionSet;

use crate::error::GrammarError;
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Parses rule text into a structured rule.
pub trait RuleGrammar: Send + Sync {
    fn parse(&self, text: &str) -> Result<SigmaRule, GrammarError>;
}

/// The YAML SIGMA rule format.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigmaYamlGrammar;

impl RuleGrammar for SigmaYamlGrammar {
    fn parse(&self, text: &str) -> Result<SigmaRule, GrammarError> {
        SigmaRule::from_yaml(text)
    }
}

/// Rule severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SigmaLevel {
    #[default]
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl FromStr for SigmaLevel {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "informational" => Ok(SigmaLevel::Informational),
            "low" => Ok(SigmaLevel::Low),
            "medium" => Ok(SigmaLevel::Medium),
            "high" => Ok(SigmaLevel::High),
            "critical" => Ok(SigmaLevel::Critical),
            other => Err(GrammarError::Yaml(format!("Unknown rule level '{other}'"))),
        }
    }
}

impl fmt::Display for SigmaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SigmaLevel::Informational => "informational",
            SigmaLevel::Low => "low",
            SigmaLevel::Medium => "medium",
            SigmaLevel::High => "high",
            SigmaLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SigmaLogSource {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

/// A `namespace.name` tag such as `attack.t1059.001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SigmaRuleTag {
    pub namespace: String,
    pub name: String,
}

impl SigmaRuleTag {
    /// Splits at the first `.`; a tag without one has an empty namespace.
    pub fn parse(tag: &str) -> Self {
        match tag.split_once('.') {
            Some((namespace, name)) => Self {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            None => Self {
                namespace: String::new(),
                name: tag.to_string(),
            },
        }
    }
}

impl fmt::Display for SigmaRuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// One `condition:` entry bound to the detections it refers to.
#[derive(Debug, Clone)]
pub struct SigmaCondition {
    expression: String,
    detections: Arc<DetectionSet>,
}

impl SigmaCondition {
    pub fn new(expression: impl Into<String>, detections: Arc<DetectionSet>) -> Self {
        Self {
            expression: expression.into(),
            detections,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Resolve this block into its condition tree and optional aggregation.
    pub fn parsed(&self) -> Result<(ConditionItem, Option<AggregationItem>), GrammarError> {
        let (search, aggregation) = match self.expression.split_once('|') {
            Some((search, aggregation)) => (search, Some(aggregation)),
            None => (self.expression.as_str(), None),
        };

        let expr = condition::parse_condition(search)?;
        let item = condition::resolve(&expr, &self.detections)?;
        let aggregation = aggregation.map(condition::parse_aggregation).transpose()?;

        Ok((item, aggregation))
    }
}

#[derive(Debug, Clone)]
pub struct SigmaDetections {
    pub detections: Arc<DetectionSet>,
    pub conditions: Vec<SigmaCondition>,
}

impl SigmaDetections {
    /// Resolve every condition block in declaration order.
    pub fn parsed_conditions(
        &self,
    ) -> impl Iterator<Item = Result<(ConditionItem, Option<AggregationItem>), GrammarError>> + '_
    {
        self.conditions.iter().map(SigmaCondition::parsed)
    }
}

#[derive(Debug, Clone)]
pub struct SigmaRule {
    pub id: String,
    pub title: String,
    pub level: SigmaLevel,
    pub logsource: SigmaLogSource,
    pub tags: Vec<SigmaRuleTag>,
    pub detection: SigmaDetections,
}

impl SigmaRule {
    /// Parse a YAML rule document.
    ///
    /// Only the document's shape is validated here; detection bodies and
    /// conditions are checked when a condition block is resolved.
    pub fn from_yaml(text: &str) -> Result<Self, GrammarError> {
        let doc: Value =
            serde_yaml::from_str(text).map_err(|e| GrammarError::Yaml(e.to_string()))?;
        if !doc.is_mapping() {
            return Err(GrammarError::Yaml(
                "Rule document must be a mapping".to_string(),
            ));
        }

        let id = match doc.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(GrammarError::MissingField("id")),
        };

        let title = doc
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let level = match doc.get("level") {
            None | Some(Value::Null) => SigmaLevel::default(),
            Some(Value::String(level)) => level.parse()?,
            Some(other) => {
                return Err(GrammarError::Yaml(format!("Invalid rule level {other:?}")))
            }
        };

        let logsource = match doc.get("logsource") {
            None | Some(Value::Null) => SigmaLogSource::default(),
            Some(value) => serde_yaml::from_value(value.clone())
                .map_err(|e| GrammarError::Yaml(format!("Invalid logsource: {e}")))?,
        };

        let tags = match doc.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(tags)) => tags
                .iter()
                .map(|tag| {
                    tag.as_str()
                        .map(SigmaRuleTag::parse)
                        .ok_or_else(|| GrammarError::Yaml(format!("Invalid tag {tag:?}")))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => return Err(GrammarError::Yaml(format!("Invalid tags {other:?}"))),
        };

        let detection = parse_detection(doc.get("detection"))?;

        Ok(Self {
            id,
            title,
            level,
            logsource,
            tags,
            detection,
        })
    }
}

fn parse_detection(detection: Option<&Value>) -> Result<SigmaDetections, GrammarError> {
    let mapping = detection
        .and_then(Value::as_mapping)
        .ok_or(GrammarError::MissingField("detection"))?;

    let mut entries = Vec::new();
    let mut expressions = Vec::new();
    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| GrammarError::Yaml(format!("Invalid detection name {key:?}")))?;
        match key {
            "condition" => expressions = condition_expressions(value)?,
            "timeframe" => {}
            name => entries.push((name.to_string(), value.clone())),
        }
    }

    if expressions.is_empty() {
        return Err(GrammarError::MissingField("detection.condition"));
    }

    let detections = Arc::new(DetectionSet::new(entries));
    let conditions = expressions
        .into_iter()
        .map(|expression| SigmaCondition::new(expression, Arc::clone(&detections)))
        .collect();

    Ok(SigmaDetections {
        detections,
        conditions,
    })
}

fn condition_expressions(value: &Value) -> Result<Vec<String>, GrammarError> {
    let invalid = || GrammarError::Condition("condition must be a string or a list of strings".to_string());
    match value {
        Value::String(expression) => Ok(vec![expression.clone()]),
        Value::Sequence(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}
