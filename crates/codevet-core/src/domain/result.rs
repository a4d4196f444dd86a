//! Execution and verification result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::block::CodeBlock;
use super::issue::{Issue, Severity};

/// Outcome of one sandboxed execution attempt.
///
/// Produced exactly once per attempt; `success` is true iff `exit_code == 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// Whether the program exited with code 0.
    pub success: bool,

    /// Captured stdout (UTF-8, lossy, capped by the provider).
    pub stdout: String,

    /// Captured stderr (UTF-8, lossy, capped by the provider).
    pub stderr: String,

    /// Provider-level error description, when the run did not complete
    /// normally (spawn failure, timeout, output cap, missing credential).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Exit code; -1 when the process was killed or never ran.
    pub exit_code: i32,

    /// Wall-clock duration of the attempt in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// A completed run, successful iff the exit code is zero.
    pub fn completed(stdout: String, stderr: String, exit_code: i32, duration_ms: u64) -> Self {
        Self {
            success: exit_code == 0,
            stdout,
            stderr,
            error: None,
            exit_code,
            duration_ms,
        }
    }

    /// A run that never completed normally.
    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
            exit_code: -1,
            duration_ms,
        }
    }

    /// Whether this result records a timeout.
    pub fn timed_out(&self) -> bool {
        self.error
            .as_deref()
            .map(|e| e.contains("timed out"))
            .unwrap_or(false)
    }
}

/// Per-block verification outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeBlockResult {
    /// The block that was verified.
    pub block: CodeBlock,

    /// True iff no issue has `error` severity.
    pub passed: bool,

    /// Issues from all stages, in stage order.
    pub issues: Vec<Issue>,

    /// Present only when a sandbox provider attempted the block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
}

impl CodeBlockResult {
    /// Build a result, deriving `passed` from the issue list.
    pub fn from_issues(
        block: CodeBlock,
        issues: Vec<Issue>,
        execution: Option<ExecutionResult>,
    ) -> Self {
        let passed = !issues.iter().any(Issue::is_error);
        Self {
            block,
            passed,
            issues,
            execution,
        }
    }

    /// Count of issues at a given severity.
    pub fn count_at(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Aggregate statistics for one verification call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyStats {
    /// Number of blocks verified.
    pub total_blocks: usize,

    /// Blocks with no error-severity issues.
    pub passed_blocks: usize,

    /// Blocks with at least one error-severity issue.
    pub failed_blocks: usize,

    /// Size of the resolved rule list (not the count that triggered).
    pub rules_checked: usize,

    /// Wall-clock duration of the whole call in milliseconds.
    pub duration_ms: u64,

    /// Name of the provider that executed code, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_provider: Option<String>,
}

impl VerifyStats {
    /// Stats for a zero-block call.
    pub fn empty() -> Self {
        Self {
            total_blocks: 0,
            passed_blocks: 0,
            failed_blocks: 0,
            rules_checked: 0,
            duration_ms: 0,
            sandbox_provider: None,
        }
    }
}

/// The aggregate verdict for one verification call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyResult {
    /// Unique id for this verification run.
    pub run_id: Uuid,

    /// When the verdict was produced.
    pub finished_at: DateTime<Utc>,

    /// True iff every block passed.
    pub passed: bool,

    /// All issues, flattened: block order, then issue order within a block.
    pub issues: Vec<Issue>,

    /// Per-block results in original block order.
    pub blocks: Vec<CodeBlockResult>,

    /// Aggregate statistics.
    pub stats: VerifyStats,
}

impl VerifyResult {
    /// Aggregate per-block results into a verdict.
    ///
    /// Preserves block order; the flattened issue list follows it.
    pub fn aggregate(
        blocks: Vec<CodeBlockResult>,
        rules_checked: usize,
        duration_ms: u64,
        sandbox_provider: Option<String>,
    ) -> Self {
        let passed_blocks = blocks.iter().filter(|b| b.passed).count();
        let failed_blocks = blocks.len() - passed_blocks;
        let issues: Vec<Issue> = blocks
            .iter()
            .flat_map(|b| b.issues.iter().cloned())
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            finished_at: Utc::now(),
            passed: failed_blocks == 0,
            issues,
            stats: VerifyStats {
                total_blocks: blocks.len(),
                passed_blocks,
                failed_blocks,
                rules_checked,
                duration_ms,
                sandbox_provider,
            },
            blocks,
        }
    }

    /// An immediately-passing result for zero input blocks.
    pub fn empty() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            finished_at: Utc::now(),
            passed: true,
            issues: Vec::new(),
            blocks: Vec::new(),
            stats: VerifyStats::empty(),
        }
    }
}
