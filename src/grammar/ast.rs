//! Condition tree produced by the rule grammar.
//!
//! Branch nodes keep their declared children as [`ConditionArg`]s so that a
//! reference the grammar could not resolve stays visible to the compiler,
//! which rejects it.

use std::fmt;

/// Numeric literal from a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SigmaNumber {
    Integer(i64),
    Float(f64),
}

impl SigmaNumber {
    pub fn as_f32(self) -> f32 {
        match self {
            SigmaNumber::Integer(i) => i as f32,
            SigmaNumber::Float(f) => f as f32,
        }
    }
}

impl fmt::Display for SigmaNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigmaNumber::Integer(i) => write!(f, "{i}"),
            SigmaNumber::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Numeric comparison leaf. The operator is kept as written in the rule and
/// validated by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaCompare {
    pub op: String,
    pub number: SigmaNumber,
}

/// Typed value on the right-hand side of a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum SigmaValue {
    String(String),
    Boolean(bool),
    Number(SigmaNumber),
    Null,
    Regex(String),
    Cidr(String),
    Compare(SigmaCompare),
    /// "field equals any of these".
    Expansion(Vec<SigmaValue>),
}

impl SigmaValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SigmaValue::String(_) => "string",
            SigmaValue::Boolean(_) => "boolean",
            SigmaValue::Number(_) => "number",
            SigmaValue::Null => "null",
            SigmaValue::Regex(_) => "regex",
            SigmaValue::Cidr(_) => "cidr",
            SigmaValue::Compare(_) => "compare",
            SigmaValue::Expansion(_) => "expansion",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEqualsValue {
    pub field: String,
    pub value: SigmaValue,
}

impl FieldEqualsValue {
    pub fn new(field: impl Into<String>, value: SigmaValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionItem {
    And(Vec<ConditionArg>),
    Or(Vec<ConditionArg>),
    Not(Vec<ConditionArg>),
    FieldEqualsValue(FieldEqualsValue),
    /// Keyword search over all values of a record.
    Value(SigmaValue),
    /// Named reference left in place of a node.
    Identifier(String),
}

impl ConditionItem {
    pub fn and(items: impl IntoIterator<Item = ConditionItem>) -> Self {
        ConditionItem::And(items.into_iter().map(ConditionArg::Resolved).collect())
    }

    pub fn or(items: impl IntoIterator<Item = ConditionItem>) -> Self {
        ConditionItem::Or(items.into_iter().map(ConditionArg::Resolved).collect())
    }

    pub fn not(item: ConditionItem) -> Self {
        ConditionItem::Not(vec![ConditionArg::Resolved(item)])
    }

    pub fn field_equals(field: impl Into<String>, value: SigmaValue) -> Self {
        ConditionItem::FieldEqualsValue(FieldEqualsValue::new(field, value))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ConditionItem::And(_) => "AND",
            ConditionItem::Or(_) => "OR",
            ConditionItem::Not(_) => "NOT",
            ConditionItem::FieldEqualsValue(_) => "FieldEqualsValue",
            ConditionItem::Value(_) => "Value",
            ConditionItem::Identifier(_) => "Identifier",
        }
    }
}

/// One declared child of a branch node.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionArg {
    Resolved(ConditionItem),
    Unresolved(String),
}

impl ConditionArg {
    pub fn resolved(&self) -> Option<&ConditionItem> {
        match self {
            ConditionArg::Resolved(item) => Some(item),
            ConditionArg::Unresolved(_) => None,
        }
    }
}

/// Aggregation clause trailing a condition, e.g. `| count() by user > 5`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationItem {
    pub function: String,
    pub field: Option<String>,
    pub group_by: Option<String>,
    pub op: String,
    pub threshold: SigmaNumber,
}
