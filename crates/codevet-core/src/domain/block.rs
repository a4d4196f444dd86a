//! Code block and language types.

use serde::{Deserialize, Serialize};

/// Languages the verifier recognises.
///
/// `Unknown` is the absence of a tag, not an error: untagged blocks still
/// receive syntax-independent rule checks, they are simply never executed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Bash,
    Rust,
    Go,
    Ruby,
    Unknown,
}

impl Language {
    /// Normalise a fence tag or file extension into a language.
    ///
    /// Unrecognised tags map to `Unknown` rather than failing; the resolver
    /// must tolerate arbitrary markdown fences.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Language::Python,
            "javascript" | "js" | "node" | "mjs" => Language::JavaScript,
            "typescript" | "ts" => Language::TypeScript,
            "bash" | "sh" | "shell" | "zsh" => Language::Bash,
            "rust" | "rs" => Language::Rust,
            "go" | "golang" => Language::Go,
            "ruby" | "rb" => Language::Ruby,
            _ => Language::Unknown,
        }
    }

    /// Canonical lowercase name, matching the serde tag.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Bash => "bash",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Ruby => "ruby",
            Language::Unknown => "unknown",
        }
    }

    /// Whether this is a known (tagged) language.
    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Unknown)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One language-tagged unit of source text to be verified.
///
/// Immutable once produced; the orchestrator never mutates a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeBlock {
    /// Resolved language of the block.
    pub language: Language,

    /// The source text.
    pub code: String,

    /// 1-based line in the originating document where the block starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,

    /// 1-based line in the originating document where the block ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

impl CodeBlock {
    /// Create a block with no document position.
    pub fn new(language: Language, code: impl Into<String>) -> Self {
        Self {
            language,
            code: code.into(),
            start_line: None,
            end_line: None,
        }
    }

    /// Create a block with its position in the originating document.
    pub fn with_span(
        language: Language,
        code: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        Self {
            language,
            code: code.into(),
            start_line: Some(start_line),
            end_line: Some(end_line),
        }
    }
}
