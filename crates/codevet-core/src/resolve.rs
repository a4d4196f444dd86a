//! Block resolution: turning raw input into language-tagged code blocks.
//!
//! Invoked once per verification call, synchronously from the
//! orchestrator's point of view (the file variant does blocking I/O).

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{CodeBlock, Language, Result};

/// One disambiguated input source.
///
/// The caller (CLI) is responsible for the fatal "zero or multiple sources"
/// validation; this enum can only represent exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveInput {
    /// A raw code string with an optional language tag.
    Code {
        code: String,
        language: Option<Language>,
    },
    /// Markdown or mixed text; fenced blocks are extracted.
    Text(String),
    /// A file on disk; `.md`/`.markdown` recurses into text extraction,
    /// anything else becomes a single block tagged by extension.
    File(PathBuf),
}

/// Resolve an input source to a list of code blocks.
pub fn resolve_blocks(input: &ResolveInput) -> Result<Vec<CodeBlock>> {
    match input {
        ResolveInput::Code { code, language } => Ok(vec![CodeBlock::new(
            (*language).unwrap_or(Language::Unknown),
            code.clone(),
        )]),
        ResolveInput::Text(text) => Ok(extract_from_text(text)),
        ResolveInput::File(path) => resolve_file(path),
    }
}

fn resolve_file(path: &Path) -> Result<Vec<CodeBlock>> {
    let contents = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if extension == "md" || extension == "markdown" {
        return Ok(extract_from_text(&contents));
    }

    let language = Language::from_tag(&extension);
    debug!(path = %path.display(), language = %language, "resolved file to one block");
    Ok(vec![CodeBlock::new(language, contents)])
}

/// An open fence while scanning markdown-ish text.
struct Fence<'a> {
    marker: &'static str,
    language: Language,
    start_line: usize,
    lines: Vec<&'a str>,
}

impl Fence<'_> {
    fn into_block(self, end_line: usize) -> Option<CodeBlock> {
        let code = join_lines(&self.lines);
        if code.trim().is_empty() {
            return None;
        }
        Some(CodeBlock::with_span(
            self.language,
            code,
            self.start_line,
            end_line.max(self.start_line),
        ))
    }
}

/// Extract fenced code blocks from markdown-ish text.
///
/// Recognises ``` and ~~~ fences with an optional info tag. Text without
/// any fence resolves to a single untagged block when it plausibly is code
/// on its own, otherwise to nothing.
fn extract_from_text(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut fence: Option<Fence> = None;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();

        let closes = matches!(&fence, Some(open) if trimmed.starts_with(open.marker));
        if closes {
            if let Some(open) = fence.take() {
                // `idx` is the fence line; content ended on the line above.
                blocks.extend(open.into_block(idx));
            }
            continue;
        }

        if let Some(open) = fence.as_mut() {
            open.lines.push(line);
            continue;
        }

        for marker in ["```", "~~~"] {
            if let Some(info) = trimmed.strip_prefix(marker) {
                // Only the first word of the info string is a tag.
                let tag = info.split_whitespace().next().unwrap_or("");
                fence = Some(Fence {
                    marker,
                    language: Language::from_tag(tag),
                    // Content starts on the next line; lines are 1-based.
                    start_line: idx + 2,
                    lines: Vec::new(),
                });
                break;
            }
        }
    }

    // An unterminated fence still counts: verify what we saw.
    if let Some(open) = fence {
        let end_line = open.start_line + open.lines.len().saturating_sub(1);
        blocks.extend(open.into_block(end_line));
    }

    if blocks.is_empty() && looks_like_bare_code(text) {
        return vec![CodeBlock::new(Language::Unknown, text.to_string())];
    }

    blocks
}

fn join_lines(lines: &[&str]) -> String {
    let mut code = lines.join("\n");
    if !code.is_empty() {
        code.push('\n');
    }
    code
}

/// Whether unfenced text plausibly is code rather than prose.
///
/// Biased toward "not code": prose sent to the verifier should resolve to
/// zero blocks, not to a spurious unknown-language block.
fn looks_like_bare_code(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return false;
    }

    let codeish = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            line.starts_with("    ")
                || line.starts_with('\t')
                || trimmed.ends_with(';')
                || trimmed.ends_with('{')
                || trimmed.ends_with(':')
                || trimmed.contains(" = ")
                || trimmed.starts_with("def ")
                || trimmed.starts_with("fn ")
                || trimmed.starts_with("function ")
                || trimmed.starts_with("import ")
                || trimmed.starts_with("from ")
                || trimmed.starts_with("#include")
        })
        .count();

    codeish * 2 > lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_input_single_block() {
        let input = ResolveInput::Code {
            code: "print(1)".to_string(),
            language: Some(Language::Python),
        };
        let blocks = resolve_blocks(&input).expect("resolve");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, Language::Python);
    }

    #[test]
    fn test_code_input_untagged_is_unknown() {
        let input = ResolveInput::Code {
            code: "whatever".to_string(),
            language: None,
        };
        let blocks = resolve_blocks(&input).expect("resolve");
        assert_eq!(blocks[0].language, Language::Unknown);
    }

    #[test]
    fn test_markdown_fences_with_tags_and_spans() {
        let text = "intro\n```python\nx = 1\n```\nmiddle\n```js\nlet y = 2;\n```\n";
        let blocks = extract_from_text(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, Language::Python);
        assert_eq!(blocks[0].code, "x = 1\n");
        assert_eq!(blocks[0].start_line, Some(3));
        assert_eq!(blocks[0].end_line, Some(3));
        assert_eq!(blocks[1].language, Language::JavaScript);
        assert_eq!(blocks[1].start_line, Some(7));
    }

    #[test]
    fn test_tilde_fence_and_unknown_tag() {
        let text = "~~~weird\nstuff\n~~~\n";
        let blocks = extract_from_text(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, Language::Unknown);
    }

    #[test]
    fn test_unterminated_fence_still_resolves() {
        let text = "```python\nx = 1\n";
        let blocks = extract_from_text(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "x = 1\n");
    }

    #[test]
    fn test_empty_fence_is_dropped() {
        let text = "```python\n\n```\n";
        assert!(extract_from_text(text).is_empty());
    }

    #[test]
    fn test_prose_resolves_to_nothing() {
        let text = "This is a paragraph about code.\nIt mentions functions but is not one.\n";
        assert!(extract_from_text(text).is_empty());
    }

    #[test]
    fn test_bare_code_resolves_to_unknown_block() {
        let text = "x = 1\ny = x + 2\nprint(y)\n";
        let blocks = extract_from_text(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, Language::Unknown);
    }

    #[test]
    fn test_empty_text_resolves_to_nothing() {
        assert!(extract_from_text("").is_empty());
        assert!(extract_from_text("   \n \n").is_empty());
    }

    #[test]
    fn test_file_resolution_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("script.py");
        std::fs::write(&path, "print('hi')\n").expect("write");

        let blocks = resolve_blocks(&ResolveInput::File(path)).expect("resolve");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, Language::Python);
    }

    #[test]
    fn test_markdown_file_extracts_fences() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Doc\n```bash\necho hi\n```\n").expect("write");

        let blocks = resolve_blocks(&ResolveInput::File(path)).expect("resolve");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, Language::Bash);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = resolve_blocks(&ResolveInput::File(PathBuf::from(
            "/nonexistent/codevet-test.py",
        )));
        assert!(result.is_err());
    }
}
