//! Executable rules and their metadata.

use crate::event::Datum;
use crate::error::FieldCastError;
use crate::matcher::DatumPredicate;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A compiled rule: an id plus two predicates.
///
/// `evaluation_condition` is the cheap, caller-supplied prefilter and
/// `rule_condition` is compiled from the rule's detection logic. The
/// evaluator only runs the latter on datums that passed the former.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn evaluation_condition(&self) -> &DatumPredicate;

    fn rule_condition(&self) -> &DatumPredicate;

    /// Whether the prefilter accepts `datum`.
    fn is_candidate(&self, datum: &dyn Datum) -> Result<bool, FieldCastError> {
        (self.evaluation_condition())(datum)
    }

    /// Whether the compiled detection logic matches `datum`.
    fn is_match(&self, datum: &dyn Datum) -> Result<bool, FieldCastError> {
        (self.rule_condition())(datum)
    }
}

/// Routing information supplied by the system that provisions rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingMetadata {
    pub monitor_id: Option<String>,
    pub detector_name: Option<String>,
    pub findings_index: Option<String>,
}

impl RoutingMetadata {
    pub const MONITOR_ID_KEY: &'static str = "monitorId";
    pub const DETECTOR_NAME_KEY: &'static str = "detectorName";
    pub const FINDINGS_INDEX_KEY: &'static str = "findingsIndex";

    /// Picks the recognized keys out of a caller map. Other keys are ignored
    /// and missing ones stay `None`.
    pub fn from_map(metadata: &HashMap<String, String>) -> Self {
        let get = |key: &str| metadata.get(key).cloned();
        Self {
            monitor_id: get(Self::MONITOR_ID_KEY),
            detector_name: get(Self::DETECTOR_NAME_KEY),
            findings_index: get(Self::FINDINGS_INDEX_KEY),
        }
    }
}

/// Descriptive metadata taken from the rule document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigmaRuleMetadata {
    pub title: String,
    /// Severity level, log source service, then each `namespace.name` tag.
    pub tags: Vec<String>,
}

/// A rule matched independently against each datum.
#[derive(Clone)]
pub struct StatelessRule {
    id: String,
    evaluation_condition: DatumPredicate,
    rule_condition: DatumPredicate,
    is_stateful_condition: bool,
    routing_metadata: RoutingMetadata,
    rule_metadata: SigmaRuleMetadata,
}

impl StatelessRule {
    pub fn new(
        id: impl Into<String>,
        evaluation_condition: DatumPredicate,
        rule_condition: DatumPredicate,
        routing_metadata: RoutingMetadata,
        rule_metadata: SigmaRuleMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            evaluation_condition,
            rule_condition,
            is_stateful_condition: false,
            routing_metadata,
            rule_metadata,
        }
    }

    pub fn is_stateful_condition(&self) -> bool {
        self.is_stateful_condition
    }

    pub fn routing_metadata(&self) -> &RoutingMetadata {
        &self.routing_metadata
    }

    pub fn rule_metadata(&self) -> &SigmaRuleMetadata {
        &self.rule_metadata
    }
}

impl Rule for StatelessRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluation_condition(&self) -> &DatumPredicate {
        &self.evaluation_condition
    }

    fn rule_condition(&self) -> &DatumPredicate {
        &self.rule_condition
    }
}

impl fmt::Debug for StatelessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatelessRule")
            .field("id", &self.id)
            .field("is_stateful_condition", &self.is_stateful_condition)
            .field("routing_metadata", &self.routing_metadata)
            .field("rule_metadata", &self.rule_metadata)
            .finish_non_exhaustive()
    }
}

/// A rule that aggregates across datums.
///
/// The parser rejects aggregation rules, so nothing builds these yet; the
/// type exists so stores and matches already have a place for them.
#[derive(Clone)]
pub struct StatefulRule {
    id: String,
    evaluation_condition: DatumPredicate,
    rule_condition: DatumPredicate,
}

impl StatefulRule {
    pub fn new(
        id: impl Into<String>,
        evaluation_condition: DatumPredicate,
        rule_condition: DatumPredicate,
    ) -> Self {
        Self {
            id: id.into(),
            evaluation_condition,
            rule_condition,
        }
    }
}

impl Rule for StatefulRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluation_condition(&self) -> &DatumPredicate {
        &self.evaluation_condition
    }

    fn rule_condition(&self) -> &DatumPredicate {
        &self.rule_condition
    }
}

impl fmt::Debug for StatefulRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulRule")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Rules produced from one rule document.
#[derive(Debug, Clone, Default)]
pub struct ParsedRules {
    pub stateless_rules: Vec<Arc<StatelessRule>>,
    pub stateful_rules: Vec<Arc<StatefulRule>>,
}

impl ParsedRules {
    pub fn is_empty(&self) -> bool {
        self.stateless_rules.is_empty() && self.stateful_rules.is_empty()
    }

    pub fn extend(&mut self, other: ParsedRules) {
        self.stateless_rules.extend(other.stateless_rules);
        self.stateful_rules.extend(other.stateful_rules);
    }
}

/// Everything the caller hands over to provision one rule.
#[derive(Clone)]
pub struct RuleData {
    pub rule_text: String,
    pub evaluation_condition: DatumPredicate,
    pub metadata: HashMap<String, String>,
}

impl RuleData {
    pub fn new(rule_text: impl Into<String>, evaluation_condition: DatumPredicate) -> Self {
        Self {
            rule_text: rule_text.into(),
            evaluation_condition,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for RuleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleData")
            .field("rule_text", &self.rule_text)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
