//! Literal and comment stripping.
//!
//! Replaces string/comment content with spaces before bracket counting so
//! that brackets inside literals never skew the balance. Line breaks are
//! preserved, so line-oriented checks running on the stripped text report
//! true line numbers.

use crate::domain::Language;

/// Comment/string syntax of a language family.
struct FamilySyntax {
    line_comments: &'static [&'static str],
    block_comment: Option<(&'static str, &'static str)>,
    /// Quote characters that open a string. Triple-quote variants of these
    /// are handled for families that have them.
    quotes: &'static [char],
    triple_quotes: bool,
    template_quote: Option<char>,
    /// Whether a backslash escapes the next character inside a string.
    backslash_escapes: bool,
}

fn family(language: Language) -> FamilySyntax {
    match language {
        Language::Python => FamilySyntax {
            line_comments: &["#"],
            block_comment: None,
            quotes: &['\'', '"'],
            triple_quotes: true,
            template_quote: None,
            backslash_escapes: true,
        },
        Language::JavaScript | Language::TypeScript => FamilySyntax {
            line_comments: &["//"],
            block_comment: Some(("/*", "*/")),
            quotes: &['\'', '"'],
            triple_quotes: false,
            template_quote: Some('`'),
            backslash_escapes: true,
        },
        Language::Bash => FamilySyntax {
            line_comments: &["#"],
            block_comment: None,
            quotes: &['\'', '"'],
            triple_quotes: false,
            template_quote: None,
            backslash_escapes: true,
        },
        Language::Ruby => FamilySyntax {
            line_comments: &["#"],
            block_comment: None,
            quotes: &['\'', '"'],
            triple_quotes: false,
            template_quote: None,
            backslash_escapes: true,
        },
        // Rust char literals collide with lifetime syntax; leaving single
        // quotes alone loses some stripping but never invents imbalance.
        Language::Rust | Language::Go => FamilySyntax {
            line_comments: &["//"],
            block_comment: Some(("/*", "*/")),
            quotes: &['"'],
            triple_quotes: false,
            template_quote: None,
            backslash_escapes: true,
        },
        Language::Unknown => FamilySyntax {
            line_comments: &[],
            block_comment: None,
            quotes: &[],
            triple_quotes: false,
            template_quote: None,
            backslash_escapes: false,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    /// Inside a string opened by the given quote; `triple` marks a
    /// triple-quoted (multi-line) string.
    Str {
        quote: char,
        triple: bool,
    },
}

/// Strip literals and comments, preserving line structure.
///
/// Stripped content becomes spaces; newlines pass through untouched. The
/// scanner never fails: unterminated constructs simply strip to the end.
pub fn strip_literals(code: &str, language: Language) -> String {
    let syntax = family(language);
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            // Newlines always pass through. Line comments end here, and so
            // do single-line strings left unterminated (only triple-quoted
            // and template strings span lines).
            match state {
                State::LineComment => state = State::Code,
                State::Str { quote, triple }
                    if !triple && syntax.template_quote != Some(quote) =>
                {
                    state = State::Code;
                }
                _ => {}
            }
            out.push('\n');
            i += 1;
            continue;
        }

        match state {
            State::Code => {
                if let Some((open, _)) = syntax.block_comment {
                    if starts_with_at(&chars, i, open) {
                        state = State::BlockComment;
                        push_blank(&mut out, open.len());
                        i += open.len();
                        continue;
                    }
                }
                if let Some(marker) = syntax
                    .line_comments
                    .iter()
                    .find(|m| starts_with_at(&chars, i, m))
                {
                    state = State::LineComment;
                    push_blank(&mut out, marker.len());
                    i += marker.len();
                    continue;
                }
                if syntax.triple_quotes {
                    if let Some(&q) = syntax.quotes.iter().find(|&&q| {
                        c == q && chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q)
                    }) {
                        state = State::Str { quote: q, triple: true };
                        push_blank(&mut out, 3);
                        i += 3;
                        continue;
                    }
                }
                if syntax.quotes.contains(&c) || syntax.template_quote == Some(c) {
                    state = State::Str { quote: c, triple: false };
                    out.push(' ');
                    i += 1;
                    continue;
                }
                out.push(c);
                i += 1;
            }
            State::LineComment => {
                out.push(' ');
                i += 1;
            }
            State::BlockComment => {
                if let Some((_, close)) = syntax.block_comment {
                    if starts_with_at(&chars, i, close) {
                        state = State::Code;
                        push_blank(&mut out, close.len());
                        i += close.len();
                        continue;
                    }
                }
                out.push(' ');
                i += 1;
            }
            State::Str { quote, triple } => {
                // Bash single quotes take no escapes; everything else does
                // when the family says so.
                let escapes =
                    syntax.backslash_escapes && !(language == Language::Bash && quote == '\'');
                if escapes && c == '\\' {
                    push_blank(&mut out, 2.min(chars.len() - i));
                    i += 2;
                    continue;
                }
                if triple {
                    if c == quote
                        && chars.get(i + 1) == Some(&quote)
                        && chars.get(i + 2) == Some(&quote)
                    {
                        state = State::Code;
                        push_blank(&mut out, 3);
                        i += 3;
                        continue;
                    }
                } else if c == quote {
                    state = State::Code;
                    out.push(' ');
                    i += 1;
                    continue;
                }
                out.push(' ');
                i += 1;
            }
        }
    }

    out
}

fn starts_with_at(chars: &[char], at: usize, needle: &str) -> bool {
    needle
        .chars()
        .enumerate()
        .all(|(j, n)| chars.get(at + j) == Some(&n))
}

fn push_blank(out: &mut String, n: usize) {
    for _ in 0..n {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_preserves_line_count() {
        let code = "a = 1  # one {\nb = \"{\"\nc = 3\n";
        let stripped = strip_literals(code, Language::Python);
        assert_eq!(code.lines().count(), stripped.lines().count());
    }

    #[test]
    fn test_python_comment_brace_removed() {
        let stripped = strip_literals("x = 1  # { open\n", Language::Python);
        assert!(!stripped.contains('{'));
        assert!(stripped.contains("x = 1"));
    }

    #[test]
    fn test_python_triple_quoted_string() {
        let code = "s = \"\"\"\n{ not code }\n\"\"\"\ny = 2\n";
        let stripped = strip_literals(code, Language::Python);
        assert!(!stripped.contains('{'));
        assert!(stripped.contains("y = 2"));
    }

    #[test]
    fn test_js_block_comment_and_template() {
        let code = "const a = `{${x}`; /* } */ let b = 1;\n";
        let stripped = strip_literals(code, Language::JavaScript);
        assert!(!stripped.contains('{'));
        assert!(!stripped.contains('}'));
        assert!(stripped.contains("let b = 1;"));
    }

    #[test]
    fn test_escaped_quote_stays_inside_string() {
        let code = r#"s = "he said \"{\"" + x"#;
        let stripped = strip_literals(code, Language::Python);
        assert!(!stripped.contains('{'));
        assert!(stripped.contains("+ x"));
    }

    #[test]
    fn test_bash_single_quotes_take_no_escape() {
        // In bash, \' inside single quotes is a literal backslash then close.
        let code = r"echo 'a\' b";
        let stripped = strip_literals(code, Language::Bash);
        assert!(stripped.contains('b'));
    }

    #[test]
    fn test_rust_lifetimes_are_not_strings() {
        let code = "fn f<'a>(x: &'a str) -> &'a str { x }\n";
        let stripped = strip_literals(code, Language::Rust);
        assert!(stripped.contains('{'));
        assert!(stripped.contains('}'));
    }

    #[test]
    fn test_unknown_language_is_untouched() {
        let code = "anything \"quoted\" # commented\n";
        assert_eq!(strip_literals(code, Language::Unknown), code);
    }

    #[test]
    fn test_unterminated_string_strips_to_end() {
        let code = "x = \"unterminated {\ny = 2";
        let stripped = strip_literals(code, Language::Python);
        assert!(!stripped.contains('{'));
    }
}
