//! Built-in rule catalogue and named-set resolution.
//!
//! Catalogue content is data: each rule is a pattern or a small predicate.
//! Tests pin rule ids and one behavior scenario each, not the exact regex.

use crate::domain::{Language, Result, Severity};

use super::rule::{Rule, RuleMatch};

/// Which rules a verification run should apply.
#[derive(Debug, Clone, Default)]
pub enum RuleSelection {
    /// All built-in rules.
    #[default]
    All,
    /// Security rules only.
    Security,
    /// Quality rules only.
    Quality,
    /// A caller-supplied rule list.
    Explicit(Vec<Rule>),
    /// No analysis rules (syntax heuristics still run).
    Disabled,
}

impl RuleSelection {
    /// Parse a CLI/config token. Unrecognised tokens are an error upstream;
    /// here they resolve to `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "all" => Some(RuleSelection::All),
            "security" => Some(RuleSelection::Security),
            "quality" => Some(RuleSelection::Quality),
            "disabled" | "none" | "false" => Some(RuleSelection::Disabled),
            _ => None,
        }
    }
}

/// Resolve a selection to a concrete rule list.
pub fn resolve_rules(selection: &RuleSelection) -> Result<Vec<Rule>> {
    match selection {
        RuleSelection::All => {
            let mut rules = security_rules()?;
            rules.extend(quality_rules()?);
            Ok(rules)
        }
        RuleSelection::Security => security_rules(),
        RuleSelection::Quality => quality_rules(),
        RuleSelection::Explicit(rules) => Ok(rules.clone()),
        RuleSelection::Disabled => Ok(Vec::new()),
    }
}

/// Secret detection, dangerous dynamic execution, reckless shell usage.
pub fn security_rules() -> Result<Vec<Rule>> {
    Ok(vec![
        Rule::builder("hardcoded-secret")
            .name("Hardcoded secret")
            .pattern(
                r#"(?i)(api[_-]?key|secret|token|passwd|password)\s*[:=]\s*["'][A-Za-z0-9_\-]{16,}["']"#,
            )
            .message("hardcoded secret or API key")
            .severity(Severity::Error)
            .suggestion("load credentials from the environment or a secret store")
            .build()?,
        Rule::builder("aws-access-key")
            .name("AWS access key id")
            .pattern(r"AKIA[0-9A-Z]{16}")
            .message("AWS access key id embedded in source")
            .severity(Severity::Error)
            .suggestion("use an IAM role or environment credentials")
            .build()?,
        Rule::builder("private-key-material")
            .name("Private key material")
            .pattern(r"-----BEGIN (RSA |EC |OPENSSH )?PRIVATE KEY-----")
            .message("private key material embedded in source")
            .severity(Severity::Error)
            .build()?,
        Rule::builder("dynamic-eval")
            .name("Dynamic eval/exec")
            .languages([Language::Python, Language::JavaScript, Language::TypeScript])
            .pattern(r"\b(eval|exec)\s*\(")
            .message("dynamic eval/exec of generated strings")
            .severity(Severity::Warning)
            .suggestion("avoid evaluating dynamically constructed code")
            .build()?,
        Rule::builder("curl-pipe-shell")
            .name("curl piped to shell")
            .languages([Language::Bash])
            .pattern(r"(curl|wget)\b[^|]*\|\s*(ba)?sh")
            .message("remote script piped directly into a shell")
            .severity(Severity::Error)
            .suggestion("download, inspect, then execute")
            .build()?,
        Rule::builder("world-writable-chmod")
            .name("World-writable chmod")
            .languages([Language::Bash])
            .pattern(r"chmod\s+(-[A-Za-z]+\s+)*0?777\b")
            .message("chmod 777 makes the target world-writable")
            .severity(Severity::Warning)
            .build()?,
    ])
}

/// Placeholder/stub detection and leftover debugging noise.
pub fn quality_rules() -> Result<Vec<Rule>> {
    Ok(vec![
        Rule::builder("todo-placeholder")
            .name("TODO placeholder")
            .pattern(r"(?i)\b(TODO|FIXME)\b.*\b(implement|fill|complete)")
            .message("placeholder left where an implementation belongs")
            .severity(Severity::Warning)
            .build()?,
        Rule::builder("your-code-here")
            .name("Template stub")
            .pattern(r"(?i)(your|insert) (code|implementation) here")
            .message("template stub text left in code")
            .severity(Severity::Error)
            .suggestion("replace the stub with a real implementation")
            .build()?,
        Rule::builder("bare-ellipsis-body")
            .name("Ellipsis body")
            .languages([Language::Python])
            .check(|code, _| ellipsis_bodies(code))
            .message("function body is a bare `...` placeholder")
            .severity(Severity::Warning)
            .build()?,
        Rule::builder("silent-exception")
            .name("Silent exception")
            .languages([Language::Python])
            .pattern(r"except\s*(\w+\s*)?:\s*pass\b")
            .message("exception swallowed without handling")
            .severity(Severity::Warning)
            .suggestion("log the exception or narrow the handler")
            .build()?,
        Rule::builder("debugger-statement")
            .name("Debugger statement")
            .languages([Language::JavaScript, Language::TypeScript])
            .pattern(r"^\s*debugger\s*;?\s*$")
            .message("debugger statement left in code")
            .severity(Severity::Warning)
            .build()?,
    ])
}

/// Find `...` used as a sole statement directly under a `def` header.
fn ellipsis_bodies(code: &str) -> Vec<RuleMatch> {
    let mut matches = Vec::new();
    let lines: Vec<&str> = code.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        if !line.trim_start().starts_with("def ") {
            continue;
        }
        if let Some(next) = lines.get(idx + 1) {
            if next.trim() == "..." {
                matches.push(RuleMatch::at_line(idx + 2));
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::engine::run_rules;

    #[test]
    fn test_selection_from_token() {
        assert!(matches!(
            RuleSelection::from_token("all"),
            Some(RuleSelection::All)
        ));
        assert!(matches!(
            RuleSelection::from_token("Security"),
            Some(RuleSelection::Security)
        ));
        assert!(matches!(
            RuleSelection::from_token("false"),
            Some(RuleSelection::Disabled)
        ));
        assert!(RuleSelection::from_token("bogus").is_none());
    }

    #[test]
    fn test_all_is_union_with_unique_ids() {
        let all = resolve_rules(&RuleSelection::All).unwrap();
        let security = resolve_rules(&RuleSelection::Security).unwrap();
        let quality = resolve_rules(&RuleSelection::Quality).unwrap();
        assert_eq!(all.len(), security.len() + quality.len());

        let mut ids: Vec<&str> = all.iter().map(|r| r.id()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before, "rule ids must be globally unique");
    }

    #[test]
    fn test_disabled_resolves_to_no_rules() {
        assert!(resolve_rules(&RuleSelection::Disabled).unwrap().is_empty());
    }

    #[test]
    fn test_hardcoded_secret_scenario() {
        let rules = resolve_rules(&RuleSelection::Security).unwrap();
        let code = r#"api_key = "sk-1234567890abcdefghijklmnop""#;
        let issues = run_rules(code, Language::Python, &rules);
        assert!(issues
            .iter()
            .any(|i| i.rule_id.as_deref() == Some("hardcoded-secret") && i.is_error()));
    }

    #[test]
    fn test_curl_pipe_shell_only_flags_bash() {
        let rules = resolve_rules(&RuleSelection::Security).unwrap();
        let code = "curl https://example.com/install.sh | sh";
        assert!(!run_rules(code, Language::Bash, &rules).is_empty());
        // Same text in a Python block: the bash-scoped rule must stay silent.
        assert!(run_rules(code, Language::Python, &rules)
            .iter()
            .all(|i| i.rule_id.as_deref() != Some("curl-pipe-shell")));
    }

    #[test]
    fn test_ellipsis_body_detection() {
        let rules = resolve_rules(&RuleSelection::Quality).unwrap();
        let code = "def handler(event):\n    ...\n";
        let issues = run_rules(code, Language::Python, &rules);
        let found = issues
            .iter()
            .find(|i| i.rule_id.as_deref() == Some("bare-ellipsis-body"))
            .expect("ellipsis body flagged");
        assert_eq!(found.line, Some(2));
    }

    #[test]
    fn test_template_stub_is_error() {
        let rules = resolve_rules(&RuleSelection::Quality).unwrap();
        let issues = run_rules("# your code here", Language::Python, &rules);
        assert!(issues
            .iter()
            .any(|i| i.rule_id.as_deref() == Some("your-code-here") && i.is_error()));
    }
}
