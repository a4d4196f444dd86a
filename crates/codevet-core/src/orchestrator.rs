//! Verification orchestrator.
//!
//! One run: detect a sandbox (best-effort), fan out per-block verification
//! concurrently, join in input order, aggregate, tear the sandbox down.
//! Teardown happens exactly once on every path.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{
    CodeBlock, CodeBlockResult, ExecutionResult, Issue, IssueSource, Result, Severity,
    VerifyResult,
};
use crate::rules::{resolve_rules, run_rules, Rule, RuleSelection};
use crate::sandbox::{
    detect_provider, SandboxPreference, SandboxProvider, SandboxRunOptions, DEFAULT_TIMEOUT_SECS,
};
use crate::syntax::check_syntax;

/// Execution-related options forwarded to the sandbox per block.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOptions {
    /// Packages to install before each run (enables network for the run).
    pub install: Vec<String>,

    /// Environment variables visible to the program under test.
    pub env: BTreeMap<String, String>,

    /// Wall-clock budget per execution in seconds.
    pub timeout_secs: u64,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            install: Vec::new(),
            env: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Verify a list of blocks and aggregate a single verdict.
///
/// Zero blocks short-circuits to an immediately-passing result without
/// resolving rules or probing for a sandbox. A missing sandbox degrades
/// the run (static analysis only); it never blocks the verdict. An
/// explicit, unavailable provider preference is the one hard error.
pub async fn verify_blocks(
    blocks: Vec<CodeBlock>,
    selection: &RuleSelection,
    preference: SandboxPreference,
    exec: &ExecOptions,
) -> Result<VerifyResult> {
    if blocks.is_empty() {
        return Ok(VerifyResult::empty());
    }

    // Detection is best-effort under Auto: a detection failure must never
    // abort static analysis. Explicit preferences stay hard errors.
    let provider = match detect_provider(preference).await {
        Ok(provider) => provider,
        Err(err) if preference == SandboxPreference::Auto => {
            warn!(error = %err, "sandbox detection failed; continuing without sandbox");
            None
        }
        Err(err) => return Err(err),
    };

    verify_blocks_with_provider(blocks, selection, provider, exec).await
}

/// [`verify_blocks`] with an already-selected provider.
///
/// The seam callers (and tests) use to supply their own
/// [`SandboxProvider`] instead of going through detection.
pub async fn verify_blocks_with_provider(
    blocks: Vec<CodeBlock>,
    selection: &RuleSelection,
    provider: Option<Arc<dyn SandboxProvider>>,
    exec: &ExecOptions,
) -> Result<VerifyResult> {
    if blocks.is_empty() {
        return Ok(VerifyResult::empty());
    }

    let start = Instant::now();
    // Teardown is owed from here on: even a rule-resolution failure must
    // not leave a detected provider holding resources.
    let rules = match resolve_rules(selection) {
        Ok(rules) => Arc::new(rules),
        Err(err) => {
            if let Some(provider) = provider {
                provider.cleanup().await;
            }
            return Err(err);
        }
    };
    let rules_checked = rules.len();
    let provider_name = provider.as_ref().map(|p| p.name().to_string());

    info!(
        blocks = blocks.len(),
        rules = rules_checked,
        sandbox = provider_name.as_deref().unwrap_or("none"),
        "verifying blocks"
    );

    // One task per block, no inter-task communication. Placement in the
    // result list follows task identity, not completion order.
    let shared_blocks: Arc<Vec<CodeBlock>> = Arc::new(blocks);
    let mut handles = Vec::with_capacity(shared_blocks.len());
    for index in 0..shared_blocks.len() {
        let blocks = Arc::clone(&shared_blocks);
        let rules = Arc::clone(&rules);
        let provider = provider.clone();
        let exec = exec.clone();
        handles.push(tokio::spawn(async move {
            verify_one_block(blocks[index].clone(), &rules, provider, &exec).await
        }));
    }

    // The single synchronization point: all per-block tasks join here.
    let joined = futures::future::join_all(handles).await;
    let mut results = Vec::with_capacity(joined.len());
    for (index, handle) in joined.into_iter().enumerate() {
        match handle {
            Ok(result) => results.push(result),
            Err(err) => {
                // A panicked task must not abort the verdict; synthesize a
                // failed block result in its place.
                warn!(block = index, error = %err, "block verification task failed");
                results.push(CodeBlockResult::from_issues(
                    shared_blocks[index].clone(),
                    vec![Issue::new(
                        IssueSource::Execution,
                        Severity::Error,
                        format!("internal verification failure: {err}"),
                    )],
                    None,
                ));
            }
        }
    }

    // The single teardown point: every path after spawning reaches here.
    if let Some(provider) = provider {
        provider.cleanup().await;
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    let result = VerifyResult::aggregate(results, rules_checked, duration_ms, provider_name);
    info!(
        run_id = %result.run_id,
        passed = result.passed,
        failed_blocks = result.stats.failed_blocks,
        duration_ms,
        "verification finished"
    );
    Ok(result)
}

/// Verify one block: syntax heuristics, rules, then optional execution.
///
/// The three stages always run in this order; the static stages never
/// depend on execution. Execution happens only when a provider is present
/// and claims the block's language.
async fn verify_one_block(
    block: CodeBlock,
    rules: &[Rule],
    provider: Option<Arc<dyn SandboxProvider>>,
    exec: &ExecOptions,
) -> CodeBlockResult {
    let mut issues = check_syntax(&block.code, block.language);
    issues.extend(run_rules(&block.code, block.language, rules));

    let mut execution = None;
    if let Some(provider) = provider {
        if provider.supports(block.language) {
            let options = SandboxRunOptions::new(block.language, block.code.clone())
                .with_install(exec.install.clone())
                .with_env(exec.env.clone())
                .with_timeout_secs(exec.timeout_secs);

            let result = provider.run(&options).await;
            debug!(
                language = %block.language,
                success = result.success,
                exit_code = result.exit_code,
                "sandboxed execution finished"
            );
            if !result.success {
                issues.extend(execution_issues(&result));
            }
            execution = Some(result);
        }
    }

    CodeBlockResult::from_issues(block, issues, execution)
}

/// Issues for one failed execution: exactly one error-severity issue, plus
/// an info-severity stderr highlight when stderr adds distinct detail.
fn execution_issues(result: &ExecutionResult) -> Vec<Issue> {
    let message = match &result.error {
        Some(error) => error.clone(),
        None => format!("execution exited with code {}", result.exit_code),
    };
    let source = if result.timed_out() {
        IssueSource::Timeout
    } else {
        IssueSource::Execution
    };

    let mut issues = vec![Issue::new(source, Severity::Error, message.clone())];

    if let Some(detail) = stderr_highlight(&result.stderr) {
        if detail != message && !message.contains(&detail) {
            issues.push(Issue::new(IssueSource::Execution, Severity::Info, detail));
        }
    }

    issues
}

/// Pick the most relevant single line from stderr.
///
/// Prefers the last line shaped like a conventional `SomeError: message`
/// diagnostic; falls back to the last non-empty line.
fn stderr_highlight(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let last = *lines.last()?;

    let shaped = lines.iter().rev().find(|l| looks_like_error_line(l));
    Some(shaped.copied().unwrap_or(last).to_string())
}

/// `ValueError: ...`, `TypeError: ...`, `Error: ...` and similar shapes.
fn looks_like_error_line(line: &str) -> bool {
    let Some((head, rest)) = line.split_once(':') else {
        return false;
    };
    if rest.trim().is_empty() {
        return false;
    }
    let head = head.trim();
    !head.is_empty()
        && head.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && (head.ends_with("Error") || head.ends_with("Exception") || head == "error")
}
