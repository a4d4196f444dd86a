//! Codevet Core Library
//!
//! Verifies machine-generated code snippets before they are trusted:
//! syntax heuristics and pattern rules run against every block, and when a
//! sandbox provider is available, executable blocks run inside a hardened,
//! ephemeral container or a remote execution service. Per-block results
//! aggregate into one [`domain::VerifyResult`] verdict.

pub mod domain;
pub mod orchestrator;
pub mod report;
pub mod resolve;
pub mod rules;
pub mod sandbox;
pub mod syntax;
pub mod telemetry;

pub use domain::{
    CodeBlock, CodeBlockResult, CodevetError, ExecutionResult, Issue, IssueSource, Language,
    Result, Severity, VerifyResult, VerifyStats,
};

pub use orchestrator::{verify_blocks, verify_blocks_with_provider, ExecOptions};
pub use report::render_text;
pub use resolve::{resolve_blocks, ResolveInput};
pub use rules::{resolve_rules, run_rules, Rule, RuleMatch, RuleSelection};
pub use sandbox::{
    detect_provider, reset_availability_cache, LocalProvider, RemoteProvider, SandboxPreference,
    SandboxProvider, SandboxRunOptions, DEFAULT_TIMEOUT_SECS,
};
pub use syntax::check_syntax;
pub use telemetry::init_tracing;

/// Codevet version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
