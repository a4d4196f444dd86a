//! Source transforms applied before execution.
//!
//! TypeScript has no lightweight runner in the container image set, so it
//! is stripped down to JavaScript and run on the node runtime. The strip is
//! heuristic line surgery, not a compiler pass: it removes constructs that
//! are whole-line or easily delimited and leaves anything ambiguous alone
//! (the program then fails in the sandbox with a real runtime error, which
//! is still a correct verification outcome).

use regex::Regex;

/// Strip TypeScript type syntax, yielding runnable JavaScript.
pub fn strip_type_annotations(code: &str) -> String {
    // Whole-line declarations that have no runtime counterpart.
    let type_decl = Regex::new(r"^\s*(export\s+)?(interface|type)\s+[A-Za-z_$][\w$]*").unwrap();
    // `: Type` annotations on parameters, variables, and return positions.
    let annotation =
        Regex::new(r":\s*[A-Za-z_$][\w$.]*(\[\])?(<[^<>]*>)?(\[\])?(\s*\|\s*[A-Za-z_$][\w$.]*)*")
            .unwrap();
    // `satisfies X` / `as X` assertions.
    let assertion = Regex::new(r"\s+(as|satisfies)\s+[A-Za-z_$][\w$.]*(<[^<>]*>)?").unwrap();

    let mut out = Vec::new();
    let mut skipping_decl = false;
    let mut brace_depth = 0i64;

    for line in code.lines() {
        if skipping_decl {
            brace_depth += brace_delta(line);
            if brace_depth <= 0 && !line.trim().is_empty() {
                skipping_decl = false;
            }
            out.push(String::new());
            continue;
        }

        if type_decl.is_match(line) {
            brace_depth = brace_delta(line);
            // Single-line alias (`type X = Y;`) ends immediately.
            skipping_decl = brace_depth > 0;
            out.push(String::new());
            continue;
        }

        let stripped = annotation.replace_all(line, "");
        let stripped = assertion.replace_all(&stripped, "");
        out.push(stripped.into_owned());
    }

    let mut result = out.join("\n");
    if code.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn brace_delta(line: &str) -> i64 {
    let opens = line.chars().filter(|&c| c == '{').count() as i64;
    let closes = line.chars().filter(|&c| c == '}').count() as i64;
    opens - closes
}
