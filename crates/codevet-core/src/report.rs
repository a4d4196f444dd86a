//! Terminal rendering of verification results.
//!
//! JSON output comes straight from serde on the result types; this module
//! only builds the human-readable summary.

use std::fmt::Write as _;

use crate::domain::{Severity, VerifyResult};

/// Render a plain-text summary of a verification result.
pub fn render_text(result: &VerifyResult) -> String {
    let mut out = String::new();

    for (index, block) in result.blocks.iter().enumerate() {
        let status = if block.passed { "PASS" } else { "FAIL" };
        let location = match (block.block.start_line, block.block.end_line) {
            (Some(start), Some(end)) => format!(" (lines {start}-{end})"),
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "[{status}] block {} — {}{location}",
            index + 1,
            block.block.language,
        );

        for issue in &block.issues {
            let line = issue
                .line
                .map(|l| format!(" line {l}:"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  {} [{}]{} {}",
                severity_glyph(issue.severity),
                issue.source,
                line,
                issue.message
            );
            if let Some(suggestion) = &issue.suggestion {
                let _ = writeln!(out, "      suggestion: {suggestion}");
            }
        }

        if let Some(execution) = &block.execution {
            let _ = writeln!(
                out,
                "  executed in {}ms, exit code {}",
                execution.duration_ms, execution.exit_code
            );
        }
    }

    let stats = &result.stats;
    let verdict = if result.passed { "PASSED" } else { "FAILED" };
    let _ = writeln!(
        out,
        "\n{verdict}: {}/{} blocks passed, {} rules checked, {}ms{}",
        stats.passed_blocks,
        stats.total_blocks,
        stats.rules_checked,
        stats.duration_ms,
        match &stats.sandbox_provider {
            Some(name) => format!(", sandbox: {name}"),
            None => ", sandbox: none".to_string(),
        }
    );

    out
}

fn severity_glyph(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "✗",
        Severity::Warning => "!",
        Severity::Info => "·",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CodeBlock, CodeBlockResult, Issue, IssueSource, Language, VerifyResult,
    };

    fn failing_result() -> VerifyResult {
        let block = CodeBlock::with_span(Language::Python, "def f(x)\n", 2, 3);
        let issues = vec![Issue::new(
            IssueSource::Syntax,
            Severity::Error,
            "`def` statement is missing its trailing colon",
        )
        .with_line(1)];
        VerifyResult::aggregate(
            vec![CodeBlockResult::from_issues(block, issues, None)],
            3,
            17,
            None,
        )
    }

    #[test]
    fn test_render_shows_verdict_and_counts() {
        let rendered = render_text(&failing_result());
        assert!(rendered.contains("FAILED: 0/1 blocks passed"));
        assert!(rendered.contains("3 rules checked"));
        assert!(rendered.contains("sandbox: none"));
    }

    #[test]
    fn test_render_shows_block_status_and_issue() {
        let rendered = render_text(&failing_result());
        assert!(rendered.contains("[FAIL] block 1 — python (lines 2-3)"));
        assert!(rendered.contains("[syntax] line 1:"));
        assert!(rendered.contains("missing its trailing colon"));
    }

    #[test]
    fn test_render_empty_result() {
        let rendered = render_text(&VerifyResult::empty());
        assert!(rendered.contains("PASSED: 0/0 blocks passed"));
    }
}
