//! Bulk import of rule documents.

use crate::compiler::RuleParser;
use crate::config::ImportConfig;
use crate::error::RuleError;
use crate::rule::{ParsedRules, RuleData};
use crate::store::RuleStore;
use log::{info, warn};

/// A rule document that did not make it into the rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    /// Position of the document in the imported batch.
    pub index: usize,
    /// Rule id, when it could be read from the document.
    pub rule_id: Option<String>,
    pub error: RuleError,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Compiled rules in document order.
    pub rules: ParsedRules,
    /// Documents skipped because they use unsupported features.
    pub skipped: Vec<ImportFailure>,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.rules.stateless_rules.len() + self.rules.stateful_rules.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Replace the store's rule lists with the imported rules.
    pub fn publish(&self, store: &dyn RuleStore) {
        store.update_stateless_rules(self.rules.stateless_rules.clone());
        store.update_stateful_rules(self.rules.stateful_rules.clone());
    }
}

/// Parses many rule documents, isolating failures per document.
#[derive(Debug, Clone, Default)]
pub struct RuleImporter {
    parser: RuleParser,
    config: ImportConfig,
}

impl RuleImporter {
    pub fn new(parser: RuleParser, config: ImportConfig) -> Self {
        Self { parser, config }
    }

    pub fn parser(&self) -> &RuleParser {
        &self.parser
    }

    /// Import `documents` in order.
    ///
    /// With `fail_fast` set, the first failure is returned as the error.
    /// Otherwise failures are collected in the report and the remaining
    /// documents are still imported.
    pub fn import(&self, documents: &[RuleData]) -> Result<ImportReport, RuleError> {
        let mut report = ImportReport::default();

        for (index, document) in documents.iter().enumerate() {
            let error = match self.parser.parse_rules(document) {
                Ok(parsed) => {
                    report.rules.extend(parsed);
                    continue;
                }
                Err(error) => error,
            };

            let failure = ImportFailure {
                index,
                rule_id: self.rule_id(document, &error),
                error,
            };

            if failure.error.is_unsupported() && self.config.skip_unsupported {
                warn!(
                    "Skipping rule {} (document {}): {}",
                    failure.rule_id.as_deref().unwrap_or("<unknown>"),
                    index,
                    failure.error
                );
                report.skipped.push(failure);
                continue;
            }

            warn!(
                "Failed to import rule {} (document {}): {}",
                failure.rule_id.as_deref().unwrap_or("<unknown>"),
                index,
                failure.error
            );
            if self.config.fail_fast {
                return Err(failure.error);
            }
            report.failures.push(failure);
        }

        info!(
            "Imported {} rule(s), skipped {}, failed {}",
            report.imported(),
            report.skipped.len(),
            report.failures.len()
        );

        Ok(report)
    }

    fn rule_id(&self, document: &RuleData, error: &RuleError) -> Option<String> {
        error.rule_id().map(str::to_string).or_else(|| {
            self.parser
                .grammar()
                .parse(&document.rule_text)
                .ok()
                .map(|rule| rule.id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::always_true;
    use crate::rule::Rule;
    use crate::store::InMemoryRuleStore;

    fn document(id: &str, condition: &str) -> RuleData {
        RuleData::new(
            format!("id: {id}\ndetection:\n  s: {{a: 1}}\n  condition: {condition}\n"),
            always_true(),
        )
    }

    fn batch() -> Vec<RuleData> {
        vec![
            document("good-1", "s"),
            document("agg", "s | count() > 5"),
            document("broken", "s and missing"),
            document("good-2", "not s"),
        ]
    }

    #[test]
    fn test_import_collects_rules_and_failures() {
        let report = RuleImporter::default().import(&batch()).unwrap();

        let ids: Vec<_> = report.rules.stateless_rules.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["good-1", "good-2"]);
        assert_eq!(report.imported(), 2);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.skipped[0].rule_id.as_deref(), Some("agg"));

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
        assert_eq!(report.failures[0].rule_id.as_deref(), Some("broken"));
        assert!(report.failures[0].error.is_parse());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_unsupported_rules_fail_when_not_skipped() {
        let importer = RuleImporter::new(
            RuleParser::default(),
            ImportConfig {
                skip_unsupported: false,
                fail_fast: false,
            },
        );
        let report = importer.import(&batch()).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].error.is_unsupported());
    }

    #[test]
    fn test_fail_fast_returns_first_failure() {
        let importer = RuleImporter::new(
            RuleParser::default(),
            ImportConfig {
                skip_unsupported: true,
                fail_fast: true,
            },
        );
        let err = importer.import(&batch()).unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.rule_id(), Some("broken"));
    }

    #[test]
    fn test_unreadable_document_has_no_rule_id() {
        let report = RuleImporter::default()
            .import(&[RuleData::new("not: [valid", always_true())])
            .unwrap();
        assert_eq!(report.failures[0].rule_id, None);
    }

    #[test]
    fn test_publish_replaces_store_contents() {
        let store = InMemoryRuleStore::new();
        let report = RuleImporter::default().import(&batch()).unwrap();
        report.publish(&store);
        assert_eq!(store.stateless_rules().len(), 2);

        ImportReport::default().publish(&store);
        assert!(store.stateless_rules().is_empty());
    }
}
