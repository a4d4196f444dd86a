//! Issue types: the atomic unit of reported problems.

use serde::{Deserialize, Serialize};

/// Severity of a reported issue. Only `Error` fails a block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Which stage of the pipeline produced an issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    /// A sandboxed execution failed or exited non-zero.
    Execution,
    /// A structural heuristic found a problem.
    Syntax,
    /// A configured rule matched.
    Rule,
    /// An execution exceeded its time budget.
    Timeout,
}

impl std::fmt::Display for IssueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueSource::Execution => "execution",
            IssueSource::Syntax => "syntax",
            IssueSource::Rule => "rule",
            IssueSource::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// One reported problem. Purely descriptive; carries no side effects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    /// Pipeline stage that produced the issue.
    pub source: IssueSource,

    /// Severity; only `error` fails a block.
    pub severity: Severity,

    /// Human-readable description.
    pub message: String,

    /// Id of the rule that matched, for rule-sourced issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    /// 1-based line within the block, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Suggested remediation, when the rule provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Issue {
    /// Create an issue with only the required fields.
    pub fn new(source: IssueSource, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            source,
            severity,
            message: message.into(),
            rule_id: None,
            line: None,
            suggestion: None,
        }
    }

    /// Attach a rule id.
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Attach a 1-based line number.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach a remediation suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Whether this issue fails its block.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
