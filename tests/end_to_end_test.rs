//! End-to-end integration tests for the SIGMA rule engine.
//!
//! These tests drive the complete pipeline: rule documents are parsed and
//! compiled, published to a store, and evaluated against event batches.

use sigma_rule_engine::{
    predicate, CloudTrailEvent, Datum, DatumPredicate, FieldValue, InMemoryRuleStore, JsonDatum,
    Rule, RuleEvaluator, RuleParser, RuleStore, StatelessRuleEvaluator,
};
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn load_rule(name: &str) -> String {
    fs::read_to_string(format!("tests/rules/{name}"))
        .unwrap_or_else(|e| panic!("Failed to read {name}: {e}"))
}

fn is_cloudtrail() -> DatumPredicate {
    predicate(|datum| datum.as_any().is::<CloudTrailEvent>())
}

/// Minimal map-backed record for tests that need arbitrary fields.
#[derive(Debug, Default)]
struct MapDatum {
    fields: HashMap<String, TestValue>,
}

#[derive(Debug)]
enum TestValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl MapDatum {
    fn with_str(mut self, field: &str, value: &str) -> Self {
        self.fields
            .insert(field.to_string(), TestValue::Str(value.to_string()));
        self
    }

    fn with_int(mut self, field: &str, value: i64) -> Self {
        self.fields.insert(field.to_string(), TestValue::Int(value));
        self
    }

    fn with_float(mut self, field: &str, value: f64) -> Self {
        self.fields.insert(field.to_string(), TestValue::Float(value));
        self
    }
}

impl Datum for MapDatum {
    fn get_value(&self, field_name: &str) -> Option<FieldValue<'_>> {
        self.fields.get(field_name).map(|value| match value {
            TestValue::Str(s) => FieldValue::String(Cow::Borrowed(s.as_str())),
            TestValue::Int(i) => FieldValue::Integer(*i),
            TestValue::Float(f) => FieldValue::Float(*f),
        })
    }

    fn time_field_name(&self) -> Option<&str> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn evaluator_for(rules: &[(&str, DatumPredicate)]) -> StatelessRuleEvaluator {
    let parser = RuleParser::default();
    let store = InMemoryRuleStore::new();

    let mut compiled = Vec::new();
    for (name, evaluation_condition) in rules {
        let parsed = parser
            .parse_rule(
                &load_rule(name),
                Arc::clone(evaluation_condition),
                &HashMap::new(),
            )
            .unwrap_or_else(|e| panic!("Failed to parse {name}: {e}"));
        compiled.extend(parsed.stateless_rules);
    }
    store.update_stateless_rules(compiled);

    StatelessRuleEvaluator::new(Arc::new(store))
}

#[test]
fn test_cloudtrail_create_function_scenario() {
    init_logging();

    let evaluator = evaluator_for(&[("lambda_create_function.yml", is_cloudtrail())]);

    let batch: Vec<Arc<dyn Datum>> = vec![
        Arc::new(CloudTrailEvent::new("CreateFunction", 1_700_000_000)),
        Arc::new(CloudTrailEvent::new("DeleteFunction", 1_700_000_100)),
    ];

    let matches = evaluator.evaluate(&batch).unwrap();
    assert_eq!(matches.len(), 1);

    let matched = &matches[0];
    assert!(Arc::ptr_eq(matched.datum(), &batch[0]));
    assert_eq!(matched.stateless_rules().len(), 1);
    assert_eq!(
        matched.stateless_rules()[0].id(),
        "0b7a5c1e-9f43-4d2b-8d2e-5a1f3c6e7d01"
    );
    assert!(matched.stateful_rules().is_empty());

    let metadata = matched.stateless_rules()[0].rule_metadata();
    assert_eq!(metadata.title, "AWS Lambda Function Created");
    assert_eq!(
        metadata.tags,
        vec!["medium", "cloudtrail", "attack.persistence", "attack.t1648"]
    );
}

#[test]
fn test_evaluation_condition_filters_record_types() {
    init_logging();

    let evaluator = evaluator_for(&[("lambda_create_function.yml", is_cloudtrail())]);

    // Same field and value, but not a CloudTrail record
    let batch: Vec<Arc<dyn Datum>> = vec![
        Arc::new(JsonDatum::new(serde_json::json!({"eventName": "CreateFunction"}))),
        Arc::new(MapDatum::default().with_str("eventName", "CreateFunction")),
    ];

    assert!(evaluator.evaluate(&batch).unwrap().is_empty());
}

#[test]
fn test_network_rule_with_typed_leaves() {
    init_logging();

    let accept_all = predicate(|_| true);
    let evaluator = evaluator_for(&[("network_connection.yml", accept_all)]);

    let exfil = MapDatum::default()
        .with_str("SourceIp", "10.4.2.19")
        .with_float("BytesSent", 5_000_000.0)
        .with_str("Image", "/usr/bin/ncat")
        .with_int("DestinationPort", 4444);
    let allowlisted_port = MapDatum::default()
        .with_str("SourceIp", "10.4.2.19")
        .with_float("BytesSent", 5_000_000.0)
        .with_str("Image", "/usr/bin/ncat")
        .with_int("DestinationPort", 443);
    let external_source = MapDatum::default()
        .with_str("SourceIp", "192.168.7.1")
        .with_float("BytesSent", 5_000_000.0)
        .with_str("Image", "/usr/bin/ncat")
        .with_int("DestinationPort", 4444);
    let small_transfer = MapDatum::default()
        .with_str("SourceIp", "10.4.2.19")
        .with_float("BytesSent", 1_000_000.0)
        .with_str("Image", "/usr/bin/nc")
        .with_int("DestinationPort", 4444);
    let missing_fields = MapDatum::default().with_str("SourceIp", "10.4.2.19");

    let batch: Vec<Arc<dyn Datum>> = vec![
        Arc::new(allowlisted_port),
        Arc::new(exfil),
        Arc::new(external_source),
        Arc::new(small_transfer),
        Arc::new(missing_fields),
    ];

    let matches = evaluator.evaluate(&batch).unwrap();
    assert_eq!(matches.len(), 1);
    assert!(Arc::ptr_eq(matches[0].datum(), &batch[1]));
    assert_eq!(
        matches[0].rule_ids(),
        vec!["6c2f8e14-3a7b-4e59-b1d0-94c7a2e6f512"]
    );
}

#[test]
fn test_multiple_condition_blocks_are_ored() {
    init_logging();

    let evaluator = evaluator_for(&[("multi_condition.yml", predicate(|_| true))]);

    let event = |name: &str, identity: &str| -> Arc<dyn Datum> {
        Arc::new(JsonDatum::new(serde_json::json!({
            "eventName": name,
            "userIdentity": {"type": identity}
        })))
    };

    let batch = vec![
        event("CreateUser", "IAMUser"),
        event("CreateAccessKey", "Root"),
        event("AttachRolePolicy", "Root"),
        event("AttachGroupPolicy", "IAMUser"),
        event("CreateAccessKey", "AssumedRole"),
    ];

    let matches = evaluator.evaluate(&batch).unwrap();
    let matched: Vec<_> = matches
        .iter()
        .map(|m| {
            batch
                .iter()
                .position(|d| Arc::ptr_eq(d, m.datum()))
                .unwrap()
        })
        .collect();
    assert_eq!(matched, vec![0, 2, 4]);
}

#[test]
fn test_rule_order_is_preserved_in_matches() {
    init_logging();

    let evaluator = evaluator_for(&[
        ("multi_condition.yml", predicate(|_| true)),
        ("lambda_create_function.yml", predicate(|_| true)),
        ("network_connection.yml", predicate(|_| true)),
    ]);

    let batch: Vec<Arc<dyn Datum>> = vec![Arc::new(JsonDatum::new(serde_json::json!({
        "eventName": "CreateFunction"
    })))];

    let matches = evaluator.evaluate(&batch).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(
        matches[0].rule_ids(),
        vec!["0b7a5c1e-9f43-4d2b-8d2e-5a1f3c6e7d01"]
    );
}

#[test]
fn test_type_drift_aborts_evaluation() {
    init_logging();

    let evaluator = evaluator_for(&[("network_connection.yml", predicate(|_| true))]);

    // BytesSent stored as text: the comparison leaf cannot read it as a number
    let drifted = MapDatum::default()
        .with_str("SourceIp", "10.0.0.1")
        .with_str("BytesSent", "lots");
    let batch: Vec<Arc<dyn Datum>> = vec![Arc::new(drifted)];

    let err = evaluator.evaluate(&batch).unwrap_err();
    assert_eq!(err.field, "BytesSent");
    assert_eq!(err.target, "float");

    // An integer counter is not a float either
    let integer_counter = MapDatum::default()
        .with_str("SourceIp", "10.0.0.1")
        .with_int("BytesSent", 1_700_000_001);
    let batch: Vec<Arc<dyn Datum>> = vec![Arc::new(integer_counter)];

    let err = evaluator.evaluate(&batch).unwrap_err();
    assert_eq!(err.field, "BytesSent");
    assert_eq!(err.target, "float");
}

#[test]
fn test_store_update_is_visible_to_next_evaluation() {
    init_logging();

    let parser = RuleParser::default();
    let store = Arc::new(InMemoryRuleStore::new());
    let evaluator = StatelessRuleEvaluator::new(store.clone());

    let batch: Vec<Arc<dyn Datum>> =
        vec![Arc::new(CloudTrailEvent::new("CreateFunction", 1))];
    assert!(evaluator.evaluate(&batch).unwrap().is_empty());

    let parsed = parser
        .parse_rule(
            &load_rule("lambda_create_function.yml"),
            is_cloudtrail(),
            &HashMap::new(),
        )
        .unwrap();
    store.update_stateless_rules(parsed.stateless_rules);
    assert_eq!(evaluator.evaluate(&batch).unwrap().len(), 1);

    store.update_stateless_rules(Vec::new());
    assert!(evaluator.evaluate(&batch).unwrap().is_empty());
}
