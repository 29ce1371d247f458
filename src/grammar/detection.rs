//! Named detection bodies and their conversion to condition trees.

use super::ast::{ConditionItem, SigmaCompare, SigmaNumber, SigmaValue};
use crate::error::GrammarError;
use serde_yaml::Value;

type Result<T> = std::result::Result<T, GrammarError>;

/// The named detections of one rule, in declaration order.
///
/// Bodies are kept as raw YAML and converted on demand, so a rule whose
/// conditions are never parsed never pays for, or fails on, its detections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    entries: Vec<(String, Value)>,
}

impl DetectionSet {
    pub(crate) fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    #[cfg(test)]
    pub(crate) fn from_yaml_str(yaml: &str) -> Self {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
        Self::new(
            mapping
                .into_iter()
                .map(|(k, v)| (k.as_str().unwrap().to_string(), v))
                .collect(),
        )
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Condition tree for a named detection, or `None` if no detection has that name.
    pub fn resolve(&self, name: &str) -> Option<Result<ConditionItem>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, body)| convert_detection(n, body))
    }
}

fn convert_detection(name: &str, body: &Value) -> Result<ConditionItem> {
    let detection_error = |message: String| GrammarError::Detection {
        name: name.to_string(),
        message,
    };

    match body {
        Value::Mapping(mapping) => convert_mapping(name, mapping),
        Value::Sequence(items) if items.is_empty() => {
            Err(detection_error("Detection list is empty".to_string()))
        }
        Value::Sequence(items) if items.iter().all(Value::is_mapping) => {
            let branches = items
                .iter()
                .filter_map(Value::as_mapping)
                .map(|mapping| convert_mapping(name, mapping))
                .collect::<Result<Vec<_>>>()?;
            Ok(single_or(branches, ConditionItem::or))
        }
        Value::Sequence(items) => {
            let keywords = items
                .iter()
                .map(|item| scalar_value(item).map(ConditionItem::Value))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    detection_error("Keyword lists may only contain scalar values".to_string())
                })?;
            Ok(single_or(keywords, ConditionItem::or))
        }
        other => scalar_value(other)
            .map(ConditionItem::Value)
            .ok_or_else(|| detection_error(format!("Unsupported detection body: {other:?}"))),
    }
}

fn convert_mapping(name: &str, mapping: &serde_yaml::Mapping) -> Result<ConditionItem> {
    if mapping.is_empty() {
        return Err(GrammarError::Detection {
            name: name.to_string(),
            message: "Detection mapping is empty".to_string(),
        });
    }

    let leaves = mapping
        .iter()
        .map(|(key, value)| {
            let key = key.as_str().ok_or_else(|| GrammarError::Detection {
                name: name.to_string(),
                message: format!("Field names must be strings, found {key:?}"),
            })?;
            convert_field(name, key, value)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(single_or(leaves, ConditionItem::and))
}

/// How a leaf's value is interpreted, chosen by its modifiers.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ValueKind {
    Plain,
    Regex,
    Cidr,
    Compare(&'static str),
}

fn convert_field(name: &str, key: &str, value: &Value) -> Result<ConditionItem> {
    let detection_error = |message: String| GrammarError::Detection {
        name: name.to_string(),
        message,
    };

    let mut parts = key.split('|');
    let field = parts.next().unwrap_or_default();
    if field.is_empty() {
        return Err(detection_error(format!("Missing field name in '{key}'")));
    }

    let mut kind = ValueKind::Plain;
    let mut match_all = false;
    for modifier in parts {
        let next = match modifier {
            "all" => {
                match_all = true;
                continue;
            }
            "re" => ValueKind::Regex,
            "cidr" => ValueKind::Cidr,
            "gt" => ValueKind::Compare(">"),
            "gte" => ValueKind::Compare(">="),
            "lt" => ValueKind::Compare("<"),
            "lte" => ValueKind::Compare("<="),
            _ => {
                return Err(GrammarError::UnsupportedModifier {
                    field: field.to_string(),
                    modifier: modifier.to_string(),
                })
            }
        };
        if kind != ValueKind::Plain {
            return Err(detection_error(format!(
                "Conflicting modifiers on field '{field}'"
            )));
        }
        kind = next;
    }

    let convert = |item: &Value| {
        typed_value(kind, item).ok_or_else(|| {
            detection_error(format!(
                "Value {item:?} of field '{field}' does not suit its modifiers"
            ))
        })
    };

    match value {
        Value::Sequence(items) if items.is_empty() => {
            Err(detection_error(format!("Field '{field}' has an empty value list")))
        }
        Value::Sequence(items) if match_all => {
            let leaves = items
                .iter()
                .map(|item| convert(item).map(|v| ConditionItem::field_equals(field, v)))
                .collect::<Result<Vec<_>>>()?;
            Ok(single_or(leaves, ConditionItem::and))
        }
        Value::Sequence(items) => {
            let values = items.iter().map(convert).collect::<Result<Vec<_>>>()?;
            Ok(ConditionItem::field_equals(field, SigmaValue::Expansion(values)))
        }
        single => Ok(ConditionItem::field_equals(field, convert(single)?)),
    }
}

fn typed_value(kind: ValueKind, value: &Value) -> Option<SigmaValue> {
    match kind {
        ValueKind::Plain => scalar_value(value),
        ValueKind::Regex => value.as_str().map(|s| SigmaValue::Regex(s.to_string())),
        ValueKind::Cidr => value.as_str().map(|s| SigmaValue::Cidr(s.to_string())),
        ValueKind::Compare(op) => {
            let number = match value {
                Value::Number(n) => number_value(n)?,
                Value::String(s) => parse_number(s.trim())?,
                _ => return None,
            };
            Some(SigmaValue::Compare(SigmaCompare {
                op: op.to_string(),
                number,
            }))
        }
    }
}

fn scalar_value(value: &Value) -> Option<SigmaValue> {
    match value {
        Value::Null => Some(SigmaValue::Null),
        Value::Bool(b) => Some(SigmaValue::Boolean(*b)),
        Value::Number(n) => number_value(n).map(SigmaValue::Number),
        Value::String(s) => Some(SigmaValue::String(s.clone())),
        _ => None,
    }
}

fn number_value(n: &serde_yaml::Number) -> Option<SigmaNumber> {
    n.as_i64()
        .map(SigmaNumber::Integer)
        .or_else(|| n.as_f64().map(SigmaNumber::Float))
}

pub(crate) fn parse_number(s: &str) -> Option<SigmaNumber> {
    s.parse::<i64>()
        .map(SigmaNumber::Integer)
        .or_else(|_| s.parse::<f64>().map(SigmaNumber::Float))
        .ok()
}

fn single_or(
    mut items: Vec<ConditionItem>,
    wrap: fn(Vec<ConditionItem>) -> ConditionItem,
) -> ConditionItem {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}
