//! Compilation of single field-equals-value leaves.

use crate::error::RuleParseError;
use crate::event::Datum;
use crate::grammar::{FieldEqualsValue, SigmaCompare, SigmaNumber, SigmaValue};
use crate::matcher::{Cidr, DatumPredicate, FieldAccessor};
use regex::Regex;
use std::sync::Arc;

/// Compiles one leaf into a predicate that reads its field through a shared
/// [`FieldAccessor`].
///
/// Everything that can be prepared ahead of time is: regex patterns and CIDR
/// blocks are parsed here, and comparison thresholds are converted once.
/// For every value kind except `null`, an absent field makes the predicate
/// return `false`.
#[derive(Debug, Clone, Default)]
pub struct LeafCompiler {
    accessor: FieldAccessor,
}

impl LeafCompiler {
    pub fn new(accessor: FieldAccessor) -> Self {
        Self { accessor }
    }

    pub fn accessor(&self) -> &FieldAccessor {
        &self.accessor
    }

    pub fn compile(&self, leaf: &FieldEqualsValue) -> Result<DatumPredicate, RuleParseError> {
        let accessor = self.accessor.clone();
        let field = leaf.field.clone();

        let predicate: DatumPredicate = match &leaf.value {
            SigmaValue::String(literal) => {
                let literal = literal.clone();
                Arc::new(move |datum: &dyn Datum| {
                    Ok(accessor
                        .get_string(datum, &field)?
                        .map_or(false, |value| value.as_ref() == literal.as_str()))
                })
            }
            SigmaValue::Boolean(literal) => {
                let literal = *literal;
                Arc::new(move |datum: &dyn Datum| {
                    Ok(accessor.get_boolean(datum, &field)? == Some(literal))
                })
            }
            SigmaValue::Number(SigmaNumber::Integer(literal)) => {
                let literal = *literal;
                Arc::new(move |datum: &dyn Datum| {
                    Ok(accessor.get_integer(datum, &field)? == Some(literal))
                })
            }
            SigmaValue::Number(number @ SigmaNumber::Float(_)) => {
                let literal = number.as_f32();
                Arc::new(move |datum: &dyn Datum| {
                    Ok(accessor.get_float(datum, &field)? == Some(literal))
                })
            }
            SigmaValue::Null => Arc::new(move |datum: &dyn Datum| {
                Ok(accessor.get_object(datum, &field)?.is_none())
            }),
            SigmaValue::Regex(pattern) => {
                let regex = Regex::new(pattern).map_err(|e| {
                    RuleParseError::new(format!(
                        "Invalid regex pattern '{pattern}' for field {field}: {e}"
                    ))
                })?;
                Arc::new(move |datum: &dyn Datum| {
                    Ok(accessor
                        .get_string(datum, &field)?
                        .map_or(false, |value| regex.is_match(&value)))
                })
            }
            SigmaValue::Cidr(block) => {
                let cidr: Cidr = block.parse()?;
                Arc::new(move |datum: &dyn Datum| {
                    Ok(accessor
                        .get_string(datum, &field)?
                        .map_or(false, |value| cidr.contains_str(&value)))
                })
            }
            SigmaValue::Compare(compare) => {
                let compare_fn = comparison(compare, &field)?;
                let threshold = compare.number.as_f32();
                Arc::new(move |datum: &dyn Datum| {
                    Ok(accessor
                        .get_float(datum, &field)?
                        .map_or(false, |value| compare_fn(value, threshold)))
                })
            }
            SigmaValue::Expansion(_) => {
                return Err(RuleParseError::new(format!(
                    "Unexpected value type {} for field {}",
                    leaf.value.kind_name(),
                    leaf.field
                )))
            }
        };

        Ok(predicate)
    }
}

fn comparison(compare: &SigmaCompare, field: &str) -> Result<fn(f32, f32) -> bool, RuleParseError> {
    match compare.op.as_str() {
        ">" => Ok(|value, threshold| value > threshold),
        "<" => Ok(|value, threshold| value < threshold),
        ">=" => Ok(|value, threshold| value >= threshold),
        "<=" => Ok(|value, threshold| value <= threshold),
        op => Err(RuleParseError::new(format!(
            "Unexpected operator {op} for field {field}"
        ))),
    }
}
