//! Syntax heuristics: stateless, language-specific structural checks.
//!
//! Deliberately heuristic, not a parser. The design bias is false
//! negatives over false positives: on ambiguous input the checks stay
//! silent. Unknown languages are never flagged.

pub mod strip;

use crate::domain::{Issue, IssueSource, Language, Severity};

use strip::strip_literals;

/// Python statement keywords whose header line must end with a colon.
const PYTHON_BLOCK_KEYWORDS: &[&str] = &[
    "def", "if", "elif", "else", "for", "while", "class", "try", "except", "finally", "with",
];

/// Run the structural heuristics for one block.
///
/// Always runs, independent of rule configuration; cannot be disabled per
/// block. Tolerates any input without panicking.
pub fn check_syntax(code: &str, language: Language) -> Vec<Issue> {
    if !language.is_known() {
        return Vec::new();
    }

    let stripped = strip_literals(code, language);
    let mut issues = Vec::new();

    if language == Language::Python {
        issues.extend(check_python_block_headers(&stripped));
    }

    issues.extend(check_bracket_balance(&stripped));
    issues
}

/// Flag `def foo(x)`-style headers missing their trailing colon.
///
/// Skips any header line containing a colon anywhere (one-liners such as
/// `if x: y` are fine), an unclosed bracket (multi-line signature), or a
/// trailing line-continuation backslash.
fn check_python_block_headers(stripped: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (idx, line) in stripped.lines().enumerate() {
        let trimmed = line.trim();
        let Some(first_word) = trimmed.split(|c: char| !c.is_alphanumeric() && c != '_').next()
        else {
            continue;
        };
        if !PYTHON_BLOCK_KEYWORDS.contains(&first_word) {
            continue;
        }
        if trimmed.contains(':') || trimmed.ends_with('\\') {
            continue;
        }
        if !line_brackets_balanced(trimmed) {
            continue;
        }

        issues.push(
            Issue::new(
                IssueSource::Syntax,
                Severity::Error,
                format!("`{first_word}` statement is missing its trailing colon"),
            )
            .with_line(idx + 1)
            .with_suggestion(format!("end the `{first_word}` line with `:`")),
        );
    }

    issues
}

fn line_brackets_balanced(line: &str) -> bool {
    let mut paren = 0i64;
    let mut square = 0i64;
    let mut curly = 0i64;
    for c in line.chars() {
        match c {
            '(' => paren += 1,
            ')' => paren -= 1,
            '[' => square += 1,
            ']' => square -= 1,
            '{' => curly += 1,
            '}' => curly -= 1,
            _ => {}
        }
    }
    paren == 0 && square == 0 && curly == 0
}

/// Count bracket pairs over the whole stripped block.
///
/// Both surpluses are reported: leftover openers and excess closers.
fn check_bracket_balance(stripped: &str) -> Vec<Issue> {
    let pairs = [('(', ')', "parentheses"), ('[', ']', "brackets"), ('{', '}', "braces")];
    let mut issues = Vec::new();

    for (open, close, label) in pairs {
        let opens = stripped.chars().filter(|&c| c == open).count() as i64;
        let closes = stripped.chars().filter(|&c| c == close).count() as i64;
        let delta = opens - closes;
        if delta == 0 {
            continue;
        }

        let (count, which) = if delta > 0 {
            (delta, open)
        } else {
            (-delta, close)
        };
        issues.push(Issue::new(
            IssueSource::Syntax,
            Severity::Error,
            format!("unbalanced {label}: {count} unmatched '{which}'"),
        ));
    }

    issues
}
