//! Rule definition and construction-time validation.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use crate::domain::{CodevetError, Language, Result, Severity};

/// Custom predicate invoked once per block with `(code, language)`.
///
/// Returns zero or more matches. A panicking predicate is a defect in the
/// rule itself; the engine does not catch it.
pub type RuleCheckFn = Arc<dyn Fn(&str, Language) -> Vec<RuleMatch> + Send + Sync>;

/// One occurrence emitted by a custom predicate.
///
/// Fields present here override the parent rule's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMatch {
    /// Override for the rule's message.
    pub message: Option<String>,

    /// 1-based line within the block.
    pub line: Option<usize>,

    /// Override for the rule's suggestion.
    pub suggestion: Option<String>,
}

impl RuleMatch {
    /// A match at a specific line with the rule's default message.
    pub fn at_line(line: usize) -> Self {
        Self {
            line: Some(line),
            ..Self::default()
        }
    }

    /// A match with its own message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// A named, language-scoped check: a per-line pattern and/or a predicate.
///
/// Immutable after construction; [`Rule::builder`] enforces the invariants
/// (non-empty id/name/message, at least one of pattern/check) so the engine
/// never has to guard against a malformed rule.
#[derive(Clone)]
pub struct Rule {
    id: String,
    name: String,
    languages: Option<HashSet<Language>>,
    pattern: Option<Regex>,
    check: Option<RuleCheckFn>,
    message: String,
    severity: Severity,
    suggestion: Option<String>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("languages", &self.languages)
            .field("pattern", &self.pattern.as_ref().map(|p| p.as_str()))
            .field("check", &self.check.as_ref().map(|_| "<fn>"))
            .field("severity", &self.severity)
            .finish()
    }
}

impl Rule {
    /// Start building a rule. `id` must be globally unique.
    pub fn builder(id: impl Into<String>) -> RuleBuilder {
        RuleBuilder {
            id: id.into(),
            name: String::new(),
            languages: None,
            pattern: None,
            check: None,
            message: String::new(),
            severity: Severity::Warning,
            suggestion: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub fn check(&self) -> Option<&RuleCheckFn> {
        self.check.as_ref()
    }

    /// Whether this rule applies to a block of the given language.
    ///
    /// A restriction set is a positive allowlist of known languages: an
    /// unrestricted rule applies to every block, a restricted rule only to
    /// blocks whose known language is in the set. `Unknown` blocks therefore
    /// never match a restricted rule.
    pub fn applies_to(&self, language: Language) -> bool {
        match &self.languages {
            None => true,
            Some(set) => set.contains(&language),
        }
    }
}

/// Builder for [`Rule`]; `build()` performs the construction-time validation.
pub struct RuleBuilder {
    id: String,
    name: String,
    languages: Option<HashSet<Language>>,
    pattern: Option<String>,
    check: Option<RuleCheckFn>,
    message: String,
    severity: Severity,
    suggestion: Option<String>,
}

impl RuleBuilder {
    /// Human-readable rule name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restrict the rule to a set of languages.
    pub fn languages(mut self, languages: impl IntoIterator<Item = Language>) -> Self {
        self.languages = Some(languages.into_iter().collect());
        self
    }

    /// Per-line pattern. Compiled (and validated) at `build()`.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Custom predicate invoked once per block.
    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str, Language) -> Vec<RuleMatch> + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(check));
        self
    }

    /// Default message for issues emitted by this rule.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Validate and construct the rule.
    pub fn build(self) -> Result<Rule> {
        let fail = |reason: &str| {
            Err(CodevetError::InvalidRule {
                id: self.id.clone(),
                reason: reason.to_string(),
            })
        };

        if self.id.trim().is_empty() {
            return Err(CodevetError::InvalidRule {
                id: "<empty>".to_string(),
                reason: "id must be non-empty".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return fail("name must be non-empty");
        }
        if self.message.trim().is_empty() {
            return fail("message must be non-empty");
        }
        if self.pattern.is_none() && self.check.is_none() {
            return fail("rule needs a pattern or a check");
        }

        let pattern = match &self.pattern {
            Some(src) => Some(Regex::new(src).map_err(|e| CodevetError::InvalidRule {
                id: self.id.clone(),
                reason: format!("invalid pattern '{src}': {e}"),
            })?),
            None => None,
        };

        Ok(Rule {
            id: self.id,
            name: self.name,
            languages: self.languages,
            pattern,
            check: self.check,
            message: self.message,
            severity: self.severity,
            suggestion: self.suggestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_pattern_rule() {
        let rule = Rule::builder("no-todo")
            .name("No TODO markers")
            .pattern(r"TODO")
            .message("TODO marker left in code")
            .severity(Severity::Warning)
            .build()
            .expect("valid rule");
        assert_eq!(rule.id(), "no-todo");
        assert!(rule.pattern().is_some());
        assert!(rule.check().is_none());
    }

    #[test]
    fn test_build_check_rule() {
        let rule = Rule::builder("long-block")
            .name("Block too long")
            .check(|code, _lang| {
                if code.lines().count() > 500 {
                    vec![RuleMatch::default()]
                } else {
                    vec![]
                }
            })
            .message("block exceeds 500 lines")
            .build()
            .expect("valid rule");
        assert!(rule.check().is_some());
    }

    #[test]
    fn test_build_rejects_neither_pattern_nor_check() {
        let err = Rule::builder("empty")
            .name("Empty")
            .message("m")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("pattern or a check"));
    }

    #[test]
    fn test_build_rejects_empty_fields() {
        assert!(Rule::builder("").name("n").message("m").pattern("x").build().is_err());
        assert!(Rule::builder("id").message("m").pattern("x").build().is_err());
        assert!(Rule::builder("id").name("n").pattern("x").build().is_err());
    }

    #[test]
    fn test_build_rejects_invalid_regex() {
        let err = Rule::builder("bad-re")
            .name("Bad")
            .pattern(r"(unclosed")
            .message("m")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn test_applies_to_unrestricted() {
        let rule = Rule::builder("any")
            .name("Any")
            .pattern("x")
            .message("m")
            .build()
            .unwrap();
        assert!(rule.applies_to(Language::Python));
        assert!(rule.applies_to(Language::Unknown));
    }

    #[test]
    fn test_applies_to_restricted_excludes_unknown() {
        let rule = Rule::builder("py-only")
            .name("Python only")
            .languages([Language::Python])
            .pattern("x")
            .message("m")
            .build()
            .unwrap();
        assert!(rule.applies_to(Language::Python));
        assert!(!rule.applies_to(Language::JavaScript));
        assert!(!rule.applies_to(Language::Unknown));
    }
}
