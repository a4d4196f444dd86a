//! Error types for the sandbox module.
//!
//! These are provider-internal: `SandboxProvider::run` folds them into a
//! failed [`crate::domain::ExecutionResult`] because a failing program under
//! test is an expected outcome, not a verifier defect.

use crate::domain::Language;

/// Errors produced inside the sandbox layer.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("container engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("no sandbox runtime for language '{0}'")]
    UnsupportedLanguage(Language),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("execution timed out after {limit_secs}s")]
    Timeout { limit_secs: u64 },

    #[error("{stream} exceeded {limit_bytes} byte output limit")]
    OutputLimit {
        stream: &'static str,
        limit_bytes: usize,
    },

    #[error("sandbox credential missing: set {var}")]
    CredentialMissing { var: &'static str },

    #[error("remote session error: {0}")]
    Session(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_the_budget() {
        let err = SandboxError::Timeout { limit_secs: 30 };
        assert!(err.to_string().contains("timed out after 30s"));
    }

    #[test]
    fn test_output_limit_message_names_stream_and_cap() {
        let err = SandboxError::OutputLimit {
            stream: "stdout",
            limit_bytes: 1048576,
        };
        let msg = err.to_string();
        assert!(msg.contains("stdout"));
        assert!(msg.contains("1048576"));
    }

    #[test]
    fn test_unsupported_language_names_the_language() {
        let err = SandboxError::UnsupportedLanguage(Language::Rust);
        assert!(err.to_string().contains("rust"));
    }
}
