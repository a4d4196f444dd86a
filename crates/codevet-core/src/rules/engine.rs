//! Rule engine: applies a list of rules to one code block.

use crate::domain::{Issue, IssueSource, Language};

use super::rule::Rule;

/// Apply `rules` to one block, producing issues.
///
/// Rules whose language restriction excludes the block's language are
/// skipped. Pattern rules are evaluated per line (ascending line order);
/// predicate rules once per block, with match fields overriding the rule's
/// defaults. A rule carrying both runs both, pattern issues first. Issues
/// are appended in rule-list order.
pub fn run_rules(code: &str, language: Language, rules: &[Rule]) -> Vec<Issue> {
    let mut issues = Vec::new();

    for rule in rules {
        if !rule.applies_to(language) {
            continue;
        }

        if let Some(pattern) = rule.pattern() {
            for (idx, line) in code.lines().enumerate() {
                if pattern.is_match(line) {
                    let mut issue = Issue::new(IssueSource::Rule, rule.severity(), rule.message())
                        .with_rule_id(rule.id())
                        .with_line(idx + 1);
                    if let Some(s) = rule.suggestion() {
                        issue = issue.with_suggestion(s);
                    }
                    issues.push(issue);
                }
            }
        }

        if let Some(check) = rule.check() {
            for found in check(code, language) {
                let message = found.message.as_deref().unwrap_or(rule.message());
                let mut issue = Issue::new(IssueSource::Rule, rule.severity(), message)
                    .with_rule_id(rule.id());
                if let Some(line) = found.line {
                    issue = issue.with_line(line);
                }
                if let Some(s) = found.suggestion.as_deref().or(rule.suggestion()) {
                    issue = issue.with_suggestion(s);
                }
                issues.push(issue);
            }
        }
    }

    issues
}
