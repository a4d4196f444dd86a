//! Codevet - verification gate for machine-generated code
//!
//! The `codevet` command runs static checks and optional sandboxed
//! execution over code blocks and reports a pass/fail verdict.
//!
//! ## Commands
//!
//! - `verify`: Verify a file, a code string, or stdin
//! - `rules`: List the built-in rule catalogue

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use codevet_core::{
    init_tracing, render_text, resolve_blocks, resolve_rules, verify_blocks, ExecOptions,
    Language, ResolveInput, RuleSelection, SandboxPreference,
};

/// Exit code for a failed verdict (usage errors exit 2 via clap/manual checks).
const EXIT_FAILED: i32 = 1;
const EXIT_USAGE: i32 = 2;

#[derive(Parser)]
#[command(name = "codevet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify machine-generated code before trusting it", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a file, a code string, or stdin
    Verify {
        /// Path to a source or markdown file
        path: Option<PathBuf>,

        /// Verify this code string instead of a file
        #[arg(long, conflicts_with = "path")]
        code: Option<String>,

        /// Read the input from stdin
        #[arg(long, conflicts_with_all = ["path", "code"])]
        stdin: bool,

        /// Language tag for --code / --stdin input (e.g. python, js)
        #[arg(long)]
        lang: Option<String>,

        /// Sandbox selection: auto, disabled, local, remote
        #[arg(long, default_value = "auto")]
        sandbox: String,

        /// Rule selection: all, security, quality, disabled
        #[arg(long, default_value = "all")]
        rules: String,

        /// Package to install before execution (repeatable)
        #[arg(long = "install", value_name = "PKG")]
        install: Vec<String>,

        /// Environment variable for the program under test (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Execution timeout in seconds
        #[arg(long, default_value_t = codevet_core::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in rule catalogue
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.log_json, level);

    match cli.command {
        Commands::Verify {
            path,
            code,
            stdin,
            lang,
            sandbox,
            rules,
            install,
            env,
            timeout,
            json,
        } => {
            cmd_verify(
                path, code, stdin, lang, &sandbox, &rules, install, env, timeout, json,
            )
            .await
        }
        Commands::Rules => cmd_rules(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_verify(
    path: Option<PathBuf>,
    code: Option<String>,
    stdin: bool,
    lang: Option<String>,
    sandbox: &str,
    rules: &str,
    install: Vec<String>,
    env: Vec<String>,
    timeout: u64,
    json: bool,
) -> Result<()> {
    let input = resolve_input(path, code, stdin, lang.as_deref())?;

    let Some(preference) = SandboxPreference::from_token(sandbox) else {
        usage_error(&format!(
            "unrecognised --sandbox value '{sandbox}' (expected auto, disabled, local, remote)"
        ));
    };
    let Some(selection) = RuleSelection::from_token(rules) else {
        usage_error(&format!(
            "unrecognised --rules value '{rules}' (expected all, security, quality, disabled)"
        ));
    };

    let exec = ExecOptions {
        install,
        env: parse_env_pairs(&env)?,
        timeout_secs: timeout,
    };

    let blocks = resolve_blocks(&input).context("failed to resolve input to code blocks")?;
    let result = verify_blocks(blocks, &selection, preference, &exec).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_text(&result));
    }

    if !result.passed {
        std::process::exit(EXIT_FAILED);
    }
    Ok(())
}

fn cmd_rules() -> Result<()> {
    let rules = resolve_rules(&RuleSelection::All)?;
    for rule in &rules {
        println!("{:<24} {:<8} {}", rule.id(), rule.severity(), rule.message());
    }
    println!("\n{} rules", rules.len());
    Ok(())
}

/// Disambiguate the input source: exactly one of PATH, --code, --stdin.
///
/// Zero sources (or conflicting ones clap could not catch) is a fatal
/// usage error, never silently resolved.
fn resolve_input(
    path: Option<PathBuf>,
    code: Option<String>,
    stdin: bool,
    lang: Option<&str>,
) -> Result<ResolveInput> {
    let language = lang.map(Language::from_tag);

    match (path, code, stdin) {
        (Some(path), None, false) => Ok(ResolveInput::File(path)),
        (None, Some(code), false) => Ok(ResolveInput::Code {
            code,
            language,
        }),
        (None, None, true) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            match language {
                Some(language) => Ok(ResolveInput::Code {
                    code: buffer,
                    language: Some(language),
                }),
                None => Ok(ResolveInput::Text(buffer)),
            }
        }
        (None, None, false) => {
            usage_error("no input given: pass a PATH, --code, or --stdin");
        }
        _ => {
            usage_error("more than one input given: pass exactly one of PATH, --code, --stdin");
        }
    }
}

fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --env '{pair}': expected KEY=VALUE");
        };
        if key.trim().is_empty() {
            bail!("invalid --env '{pair}': empty key");
        }
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}

fn usage_error(message: &str) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_USAGE);
}
