//! Compilation of condition trees into predicates.

use super::leaf::LeafCompiler;
use crate::error::{RuleError, RuleParseError};
use crate::grammar::{ConditionArg, ConditionItem, FieldEqualsValue, SigmaValue};
use crate::matcher::{all_of, always_false, any_of, negate, DatumPredicate, FieldAccessor};
use log::debug;

/// Turns [`ConditionItem`] trees into composed predicates.
///
/// Branch nodes are checked against their declared arity: every child must
/// have been resolved by the grammar, so a dangling reference to a missing
/// detection is reported here instead of silently shrinking the branch.
#[derive(Debug, Clone, Default)]
pub struct ConditionCompiler {
    leaves: LeafCompiler,
}

impl ConditionCompiler {
    pub fn new(accessor: FieldAccessor) -> Self {
        Self {
            leaves: LeafCompiler::new(accessor),
        }
    }

    pub fn leaf_compiler(&self) -> &LeafCompiler {
        &self.leaves
    }

    /// Compile the condition blocks of one rule, combined with OR.
    ///
    /// An empty list compiles to a predicate that never matches.
    pub fn parse_rule_condition(&self, items: &[ConditionItem]) -> Result<DatumPredicate, RuleError> {
        let mut predicates = items
            .iter()
            .map(|item| self.compile_item(item))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Compiled {} condition block(s)", predicates.len());

        match predicates.len() {
            0 => Ok(always_false()),
            1 => Ok(predicates.remove(0)),
            _ => Ok(any_of(predicates)),
        }
    }

    /// Compile a single node of a condition tree.
    pub fn compile_item(&self, item: &ConditionItem) -> Result<DatumPredicate, RuleError> {
        match item {
            ConditionItem::And(args) => Ok(all_of(self.compile_args("AND", args)?)),
            ConditionItem::Or(args) => Ok(any_of(self.compile_args("OR", args)?)),
            ConditionItem::Not(args) => {
                let mut predicates = self.compile_args("NOT", args)?;
                if predicates.len() != 1 {
                    return Err(RuleError::parse(format!(
                        "Unexpected number of conditions for NOT expression. Expected 1. Found {}",
                        predicates.len()
                    )));
                }
                Ok(negate(predicates.remove(0)))
            }
            ConditionItem::FieldEqualsValue(leaf) => match &leaf.value {
                SigmaValue::Expansion(values) => {
                    let alternatives = values
                        .iter()
                        .map(|value| {
                            ConditionArg::Resolved(ConditionItem::FieldEqualsValue(
                                FieldEqualsValue::new(leaf.field.clone(), value.clone()),
                            ))
                        })
                        .collect::<Vec<_>>();
                    self.compile_item(&ConditionItem::Or(alternatives))
                }
                _ => Ok(self.leaves.compile(leaf)?),
            },
            ConditionItem::Value(_) => Err(RuleError::unsupported(
                "Keyword lookup is not yet supported",
            )),
            ConditionItem::Identifier(name) => Err(RuleError::Parse(RuleParseError::new(format!(
                "Unexpected condition type {} referencing '{name}'",
                item.kind_name()
            )))),
        }
    }

    fn compile_args(
        &self,
        op: &str,
        args: &[ConditionArg],
    ) -> Result<Vec<DatumPredicate>, RuleError> {
        let predicates = args
            .iter()
            .filter_map(ConditionArg::resolved)
            .map(|item| self.compile_item(item))
            .collect::<Result<Vec<_>, _>>()?;

        if predicates.len() != args.len() {
            return Err(RuleError::parse(format!(
                "Unexpected number of conditions for {op} expression. Expected {}. Found {}",
                args.len(),
                predicates.len()
            )));
        }

        if predicates.is_empty() {
            return Err(RuleError::parse(format!(
                "No predicates found for {op} expression"
            )));
        }

        Ok(predicates)
    }
}
