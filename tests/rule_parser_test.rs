//! Integration tests for the rule parser.
//!
//! These tests verify that real rule documents compile into stateless rules
//! with the expected metadata, and that unsupported or malformed documents
//! are reported with the right error kind.

use sigma_rule_engine::grammar::SigmaLevel;
use sigma_rule_engine::{
    always_true, JsonDatum, Rule, RuleData, RuleError, RuleGrammar, RuleParser, SigmaYamlGrammar,
};
use std::collections::HashMap;
use std::fs;

fn load_rule(name: &str) -> String {
    fs::read_to_string(format!("tests/rules/{name}"))
        .unwrap_or_else(|e| panic!("Failed to read {name}: {e}"))
}

fn parse(text: &str) -> Result<sigma_rule_engine::ParsedRules, RuleError> {
    RuleParser::default().parse_rule(text, always_true(), &HashMap::new())
}

#[test]
fn test_grammar_reads_rule_fixtures() {
    let rule = SigmaYamlGrammar
        .parse(&load_rule("network_connection.yml"))
        .unwrap();

    assert_eq!(rule.id, "6c2f8e14-3a7b-4e59-b1d0-94c7a2e6f512");
    assert_eq!(rule.level, SigmaLevel::High);
    assert_eq!(rule.logsource.category.as_deref(), Some("network_connection"));
    assert_eq!(rule.logsource.service, None);
    assert_eq!(rule.detection.detections.len(), 4);
    assert_eq!(rule.detection.conditions.len(), 1);
}

#[test]
fn test_parse_rule_with_routing_metadata() {
    let data = RuleData::new(load_rule("lambda_create_function.yml"), always_true())
        .with_metadata("monitorId", "monitor-7")
        .with_metadata("detectorName", "aws-detector")
        .with_metadata("findingsIndex", ".findings-aws")
        .with_metadata("ignored", "value");

    let parsed = RuleParser::default().parse_rules(&data).unwrap();
    let rule = &parsed.stateless_rules[0];

    let routing = rule.routing_metadata();
    assert_eq!(routing.monitor_id.as_deref(), Some("monitor-7"));
    assert_eq!(routing.detector_name.as_deref(), Some("aws-detector"));
    assert_eq!(routing.findings_index.as_deref(), Some(".findings-aws"));
}

#[test]
fn test_missing_routing_keys_are_none() {
    let parsed = parse(&load_rule("lambda_create_function.yml")).unwrap();
    let routing = parsed.stateless_rules[0].routing_metadata();
    assert_eq!(routing.monitor_id, None);
    assert_eq!(routing.detector_name, None);
    assert_eq!(routing.findings_index, None);
}

#[test]
fn test_metadata_tags_without_service() {
    let parsed = parse(&load_rule("network_connection.yml")).unwrap();
    let metadata = parsed.stateless_rules[0].rule_metadata();
    assert_eq!(metadata.title, "Large Outbound Transfer From Internal Host");
    assert_eq!(
        metadata.tags,
        vec!["high", "", "attack.exfiltration", "attack.t1048"]
    );
}

#[test]
fn test_aggregation_rule_is_unsupported() {
    let err = parse(&load_rule("aggregation_rule.yml")).unwrap_err();
    assert!(err.is_unsupported());
    assert!(!err.is_parse());
    assert_eq!(
        err.to_string(),
        "Unsupported operation: Aggregate rules are not yet supported"
    );
}

#[test]
fn test_keyword_rule_is_unsupported() {
    let err = parse(&load_rule("keyword_rule.yml")).unwrap_err();
    assert!(err.is_unsupported());
    assert!(err.to_string().contains("Keyword lookup is not yet supported"));
}

#[test]
fn test_field_translations_apply_to_compiled_rules() {
    let mut translations = HashMap::new();
    translations.insert("eventName".to_string(), "detail.eventName".to_string());
    let parser = RuleParser::with_field_translations(translations);

    let parsed = parser
        .parse_rule(
            &load_rule("lambda_create_function.yml"),
            always_true(),
            &HashMap::new(),
        )
        .unwrap();
    let rule = &parsed.stateless_rules[0];

    let nested = JsonDatum::new(serde_json::json!({"detail": {"eventName": "CreateFunction"}}));
    let flat = JsonDatum::new(serde_json::json!({"eventName": "CreateFunction"}));
    assert!(rule.is_match(&nested).unwrap());
    assert!(!rule.is_match(&flat).unwrap());
}

#[test]
fn test_malformed_rules_are_parse_errors() {
    let cases = [
        ("not yaml: [", None),
        ("title: missing id\n", None),
        (
            "id: bad-condition\ndetection:\n  s: {a: 1}\n  condition: s and (\n",
            Some("bad-condition"),
        ),
        (
            "id: dangling\ndetection:\n  s: {a: 1}\n  condition: s or other\n",
            Some("dangling"),
        ),
        (
            "id: bad-regex\ndetection:\n  s:\n    a|re: '(open'\n  condition: s\n",
            Some("bad-regex"),
        ),
        (
            "id: bad-cidr\ndetection:\n  s:\n    ip|cidr: 300.0.0.0/8\n  condition: s\n",
            Some("bad-cidr"),
        ),
        (
            "id: wildcard-modifier\ndetection:\n  s:\n    a|startswith: x\n  condition: s\n",
            Some("wildcard-modifier"),
        ),
    ];

    for (text, rule_id) in cases {
        let err = parse(text).unwrap_err();
        assert!(err.is_parse(), "{text}: {err}");
        assert_eq!(err.rule_id(), rule_id, "{text}");
    }
}

#[test]
fn test_rule_ids_may_be_numeric() {
    let parsed = parse("id: 1234\ndetection:\n  s: {a: 1}\n  condition: s\n").unwrap();
    assert_eq!(parsed.stateless_rules[0].id(), "1234");
}

#[test]
fn test_invalid_cidr_literal_rejects_the_rule() {
    for block in ["300.0.0.0/8", "10.0.0.0/33", "not-a-network"] {
        let text = format!("id: cidr\ndetection:\n  s:\n    ip|cidr: '{block}'\n  condition: s\n");
        let err = parse(&text).unwrap_err();
        assert!(err.is_parse(), "{block}: {err}");
        assert_eq!(err.rule_id(), Some("cidr"));
        assert!(
            err.to_string().contains(&format!("Invalid CIDR notation: {block}")),
            "{err}"
        );
    }
}
