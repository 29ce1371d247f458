//! Batch evaluation of datums against the current rule set.

use crate::error::FieldCastError;
use crate::event::Datum;
use crate::rule::{Rule, StatefulRule, StatelessRule};
use crate::store::RuleStore;
use log::trace;
use std::fmt;
use std::sync::Arc;

/// One datum together with every rule it matched.
#[derive(Clone)]
pub struct Match {
    datum: Arc<dyn Datum>,
    stateless_rules: Vec<Arc<StatelessRule>>,
    stateful_rules: Vec<Arc<StatefulRule>>,
}

impl Match {
    pub fn new(
        datum: Arc<dyn Datum>,
        stateless_rules: Vec<Arc<StatelessRule>>,
        stateful_rules: Vec<Arc<StatefulRule>>,
    ) -> Self {
        Self {
            datum,
            stateless_rules,
            stateful_rules,
        }
    }

    pub fn datum(&self) -> &Arc<dyn Datum> {
        &self.datum
    }

    pub fn stateless_rules(&self) -> &[Arc<StatelessRule>] {
        &self.stateless_rules
    }

    pub fn stateful_rules(&self) -> &[Arc<StatefulRule>] {
        &self.stateful_rules
    }

    /// Ids of the matched stateless rules, in rule-set order.
    pub fn rule_ids(&self) -> Vec<&str> {
        self.stateless_rules.iter().map(|rule| rule.id()).collect()
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("stateless_rules", &self.rule_ids())
            .field("stateful_rules", &self.stateful_rules)
            .finish_non_exhaustive()
    }
}

/// Evaluates batches of datums.
pub trait RuleEvaluator {
    fn evaluate(&self, data: &[Arc<dyn Datum>]) -> Result<Vec<Match>, FieldCastError>;
}

/// Evaluates each datum independently against the store's stateless rules.
///
/// Per datum, the rule list is first narrowed by every rule's evaluation
/// condition, then by the rule condition, keeping the store's order. Datums
/// matching no rule produce no [`Match`]. A [`FieldCastError`] from any
/// predicate aborts the whole batch.
///
/// The evaluator holds no mutable state. Callers that want parallelism can
/// split a batch across threads and call [`RuleEvaluator::evaluate`] on each
/// part; every call works on one consistent snapshot of the rules.
#[derive(Clone)]
pub struct StatelessRuleEvaluator {
    store: Arc<dyn RuleStore>,
}

impl StatelessRuleEvaluator {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    fn matching_rules(
        rules: &[Arc<StatelessRule>],
        datum: &dyn Datum,
    ) -> Result<Vec<Arc<StatelessRule>>, FieldCastError> {
        let mut candidates = Vec::new();
        for rule in rules {
            if rule.is_candidate(datum)? {
                candidates.push(Arc::clone(rule));
            }
        }

        let mut matched = Vec::with_capacity(candidates.len());
        for rule in candidates {
            if rule.is_match(datum)? {
                matched.push(rule);
            }
        }
        Ok(matched)
    }
}

impl RuleEvaluator for StatelessRuleEvaluator {
    fn evaluate(&self, data: &[Arc<dyn Datum>]) -> Result<Vec<Match>, FieldCastError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let rules = self.store.stateless_rules();
        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for datum in data {
            let matched = Self::matching_rules(&rules, datum.as_ref())?;
            trace!("Datum matched {} of {} rule(s)", matched.len(), rules.len());
            if !matched.is_empty() {
                matches.push(Match::new(Arc::clone(datum), matched, Vec::new()));
            }
        }

        Ok(matches)
    }
}

impl fmt::Debug for StatelessRuleEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatelessRuleEvaluator")
            .field("stateless_rules", &self.store.stateless_rules().len())
            .finish()
    }
}
