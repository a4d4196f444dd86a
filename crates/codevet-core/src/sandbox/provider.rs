//! The sandbox provider contract.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionResult, Language};

/// Default wall-clock budget for one sandboxed execution.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options for one provider invocation.
///
/// An immutable value passed into a single `run` call; providers must not
/// retain it beyond that call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SandboxRunOptions {
    /// Source text to execute.
    pub code: String,

    /// Language of the source.
    pub language: Language,

    /// Packages to install before running; non-empty enables network for
    /// the run on providers that otherwise disable it.
    #[serde(default)]
    pub install: Vec<String>,

    /// Environment variables visible to the program.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Wall-clock budget in seconds.
    pub timeout_secs: u64,
}

impl SandboxRunOptions {
    /// Options with the default timeout and no install/env.
    pub fn new(language: Language, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language,
            install: Vec::new(),
            env: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_install(mut self, install: Vec<String>) -> Self {
        self.install = install;
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// A concrete sandbox capability: executes one code block in isolation.
///
/// A provider instance is stateful (the remote variant holds one live
/// session) but must support being discarded at any point: `cleanup` never
/// errors and is safe to call even if `run` was never called or failed.
///
/// `run` is infallible at the type level — provider failures (spawn errors,
/// timeouts, missing credentials) come back as failed [`ExecutionResult`]s.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Short provider name, reported in verification stats.
    fn name(&self) -> &'static str;

    /// Whether this provider can execute the given language.
    fn supports(&self, language: Language) -> bool;

    /// Execute one block under this provider's isolation constraints.
    async fn run(&self, options: &SandboxRunOptions) -> ExecutionResult;

    /// Release any held resources. Idempotent; never errors.
    async fn cleanup(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = SandboxRunOptions::new(Language::Python, "print(1)");
        assert_eq!(options.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(options.install.is_empty());
        assert!(options.env.is_empty());
    }

    #[test]
    fn test_options_builder_chain() {
        let mut env = BTreeMap::new();
        env.insert("KEY".to_string(), "value".to_string());
        let options = SandboxRunOptions::new(Language::Bash, "echo hi")
            .with_install(vec!["jq".to_string()])
            .with_env(env)
            .with_timeout_secs(5);
        assert_eq!(options.install, vec!["jq".to_string()]);
        assert_eq!(options.env.get("KEY").map(String::as_str), Some("value"));
        assert_eq!(options.timeout_secs, 5);
    }

    #[test]
    fn test_options_serde_roundtrip() {
        let options = SandboxRunOptions::new(Language::JavaScript, "console.log(1)")
            .with_timeout_secs(10);
        let json = serde_json::to_string(&options).expect("serialize");
        let back: SandboxRunOptions = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(options, back);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let json = r#"{"code":"x","language":"python","timeout_secs":30}"#;
        let options: SandboxRunOptions = serde_json::from_str(json).expect("deserialize");
        assert!(options.install.is_empty());
        assert!(options.env.is_empty());
    }
}
