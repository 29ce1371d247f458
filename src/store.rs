//! Holders of the current compiled rule set.

use crate::rule::{StatefulRule, StatelessRule};
use arc_swap::ArcSwap;
use log::debug;
use std::sync::Arc;

/// Shared, immutable snapshot of a rule list.
pub type RuleList<R> = Arc<Vec<Arc<R>>>;

/// Source of the rules evaluators run.
///
/// Updates replace a whole list at once. A reader holding a snapshot keeps
/// seeing that snapshot in full, whatever updates happen meanwhile.
pub trait RuleStore: Send + Sync {
    fn update_stateless_rules(&self, rules: Vec<Arc<StatelessRule>>);

    fn update_stateful_rules(&self, rules: Vec<Arc<StatefulRule>>);

    fn stateless_rules(&self) -> RuleList<StatelessRule>;

    fn stateful_rules(&self) -> RuleList<StatefulRule>;
}

/// Lock-free in-memory store. Both lists start empty.
#[derive(Debug)]
pub struct InMemoryRuleStore {
    stateless: ArcSwap<Vec<Arc<StatelessRule>>>,
    stateful: ArcSwap<Vec<Arc<StatefulRule>>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self {
            stateless: ArcSwap::from_pointee(Vec::new()),
            stateful: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore for InMemoryRuleStore {
    fn update_stateless_rules(&self, rules: Vec<Arc<StatelessRule>>) {
        debug!("Publishing {} stateless rule(s)", rules.len());
        self.stateless.store(Arc::new(rules));
    }

    fn update_stateful_rules(&self, rules: Vec<Arc<StatefulRule>>) {
        debug!("Publishing {} stateful rule(s)", rules.len());
        self.stateful.store(Arc::new(rules));
    }

    fn stateless_rules(&self) -> RuleList<StatelessRule> {
        self.stateless.load_full()
    }

    fn stateful_rules(&self) -> RuleList<StatefulRule> {
        self.stateful.load_full()
    }
}
