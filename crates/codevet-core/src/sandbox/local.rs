//! Local container-based sandbox provider.
//!
//! Executes one block per container invocation: the code lands in a fresh
//! scratch directory bind-mounted read-only into a locked-down container
//! (no network, memory/cpu/pid ceilings, read-only rootfs, no privilege
//! escalation). The scratch directory is a `TempDir`, so it is removed on
//! every exit path; a runaway container is removed by id when the run is
//! force-terminated.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::domain::{ExecutionResult, Language};

use super::error::{SandboxError, SandboxResult};
use super::provider::{SandboxProvider, SandboxRunOptions};
use super::transform::strip_type_annotations;

/// Hard cap per captured stream; crossing it terminates the process.
pub const OUTPUT_CAP_BYTES: usize = 1024 * 1024;

const MEMORY_LIMIT: &str = "256m";
const CPU_LIMIT: &str = "0.5";
const PIDS_LIMIT: &str = "64";
const TMPFS_SPEC: &str = "/tmp:rw,noexec,nosuid,size=16777216";
const ENGINE_VAR: &str = "CODEVET_CONTAINER_ENGINE";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Image/runtime/install triple for one executable language.
struct LanguageRuntime {
    image: &'static str,
    file_name: &'static str,
    /// Command that runs the code file inside the container.
    run_command: &'static str,
    /// Install-command prefix; packages are appended.
    install_command: Option<&'static str>,
}

fn runtime_for(language: Language) -> Option<LanguageRuntime> {
    match language {
        Language::Python => Some(LanguageRuntime {
            image: "python:3.12-slim",
            file_name: "main.py",
            run_command: "python /work/main.py",
            install_command: Some("pip install --quiet"),
        }),
        // TypeScript is stripped to JavaScript and runs on the node image.
        Language::JavaScript | Language::TypeScript => Some(LanguageRuntime {
            image: "node:22-slim",
            file_name: "main.js",
            run_command: "node /work/main.js",
            install_command: Some("npm install --global --silent"),
        }),
        Language::Bash => Some(LanguageRuntime {
            image: "bash:5",
            file_name: "main.sh",
            run_command: "bash /work/main.sh",
            install_command: None,
        }),
        _ => None,
    }
}

/// Process-wide availability cache: one engine probe per process lifetime.
///
/// Explicit state with an explicit reset rather than a lazy static, so
/// concurrent tests do not leak probe results between runs. A duplicate
/// probe from two racing cold detections is harmless.
static AVAILABILITY: Mutex<Option<bool>> = Mutex::new(None);

/// Forget the cached probe result. Test isolation hook.
pub fn reset_availability_cache() {
    *AVAILABILITY.lock().unwrap_or_else(|e| e.into_inner()) = None;
}

fn cached_availability() -> Option<bool> {
    *AVAILABILITY.lock().unwrap_or_else(|e| e.into_inner())
}

fn cache_availability(available: bool) {
    *AVAILABILITY.lock().unwrap_or_else(|e| e.into_inner()) = Some(available);
}

/// The default provider: one hardened container per execution.
pub struct LocalProvider {
    engine: String,
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProvider {
    /// Use the engine named by `CODEVET_CONTAINER_ENGINE`, default `docker`.
    pub fn new() -> Self {
        let engine = std::env::var(ENGINE_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "docker".to_string());
        Self { engine }
    }

    /// Probe the container engine, caching the result process-wide.
    pub async fn is_available(&self) -> bool {
        if let Some(cached) = cached_availability() {
            return cached;
        }

        let probe = Command::new(&self.engine)
            .args(["info", "--format", "{{.ServerVersion}}"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        let available = match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(err)) => {
                debug!(engine = %self.engine, error = %err, "engine probe failed to spawn");
                false
            }
            Err(_) => {
                debug!(engine = %self.engine, "engine probe timed out");
                false
            }
        };

        cache_availability(available);
        available
    }

    async fn run_inner(&self, options: &SandboxRunOptions) -> SandboxResult<ExecutionResult> {
        // Unmapped language: fail before touching the filesystem or engine.
        let runtime = runtime_for(options.language)
            .ok_or(SandboxError::UnsupportedLanguage(options.language))?;

        let code = match options.language {
            Language::TypeScript => strip_type_annotations(&options.code),
            _ => options.code.clone(),
        };

        // Scratch directory: unique per invocation, removed by the TempDir
        // guard on every exit path including timeout and panic.
        let scratch = tempfile::Builder::new()
            .prefix("codevet-run-")
            .tempdir()?;
        std::fs::write(scratch.path().join(runtime.file_name), &code)?;
        let cidfile = scratch.path().join("container.cid");

        let mut command = Command::new(&self.engine);
        command.arg("run").arg("--rm");
        command.arg("--cidfile").arg(&cidfile);
        // Network stays off unless package installation was requested.
        if options.install.is_empty() {
            command.args(["--network", "none"]);
        }
        command.args(["--memory", MEMORY_LIMIT]);
        command.args(["--cpus", CPU_LIMIT]);
        command.args(["--pids-limit", PIDS_LIMIT]);
        command.arg("--read-only");
        command.args(["--tmpfs", TMPFS_SPEC]);
        command.args(["--security-opt", "no-new-privileges"]);
        command.arg("--mount").arg(format!(
            "type=bind,source={},target=/work,readonly=true",
            scratch.path().display()
        ));
        command.args(["--workdir", "/work"]);
        for (key, value) in &options.env {
            command.arg("--env").arg(format!("{key}={value}"));
        }
        command.arg(runtime.image);

        let script = match (&runtime.install_command, options.install.is_empty()) {
            (Some(install), false) => format!(
                "{} {} && {}",
                install,
                options.install.join(" "),
                runtime.run_command
            ),
            _ => runtime.run_command.to_string(),
        };
        command.arg("sh").arg("-c").arg(&script);

        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
            command: self.engine.clone(),
            source,
        })?;

        let outcome = supervise(&mut child, Duration::from_secs(options.timeout_secs)).await;

        // On any abnormal end, remove the container the cidfile names; the
        // scratch directory itself falls with the TempDir guard.
        if outcome.is_err() {
            remove_container(&self.engine, &cidfile).await;
        }

        let (status, stdout, stderr) = outcome?;
        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code().unwrap_or(-1);

        Ok(ExecutionResult::completed(
            stdout,
            stderr,
            exit_code,
            duration_ms,
        ))
    }
}

#[async_trait]
impl SandboxProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn supports(&self, language: Language) -> bool {
        runtime_for(language).is_some()
    }

    async fn run(&self, options: &SandboxRunOptions) -> ExecutionResult {
        let start = Instant::now();
        match self.run_inner(options).await {
            Ok(result) => result,
            Err(err) => {
                debug!(language = %options.language, error = %err, "sandboxed run failed");
                ExecutionResult::failed(err.to_string(), start.elapsed().as_millis() as u64)
            }
        }
    }

    async fn cleanup(&self) {
        // Containers are `--rm` and per-invocation; scratch directories are
        // TempDir-scoped. Nothing outlives a run.
    }
}

/// Wait for the child under a wall-clock budget while capping each stream.
///
/// Force-terminates (kill + reap) on timeout or when either stream crosses
/// [`OUTPUT_CAP_BYTES`]; abandoning the wait is not enough, the process
/// must stop consuming host resources.
async fn supervise(
    child: &mut Child,
    timeout: Duration,
) -> SandboxResult<(std::process::ExitStatus, String, String)> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SandboxError::Session("child stdout not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SandboxError::Session("child stderr not piped".to_string()))?;

    let mut out_task = tokio::spawn(read_capped(stdout));
    let mut err_task = tokio::spawn(read_capped(stderr));
    let mut out_buf: Option<Vec<u8>> = None;
    let mut err_buf: Option<Vec<u8>> = None;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let status = loop {
        tokio::select! {
            _ = &mut deadline => {
                terminate(child).await;
                out_task.abort();
                err_task.abort();
                return Err(SandboxError::Timeout {
                    limit_secs: timeout.as_secs(),
                });
            }
            joined = &mut out_task, if out_buf.is_none() => {
                let (buf, capped) = joined.unwrap_or_default();
                if capped {
                    terminate(child).await;
                    err_task.abort();
                    return Err(SandboxError::OutputLimit {
                        stream: "stdout",
                        limit_bytes: OUTPUT_CAP_BYTES,
                    });
                }
                out_buf = Some(buf);
            }
            joined = &mut err_task, if err_buf.is_none() => {
                let (buf, capped) = joined.unwrap_or_default();
                if capped {
                    terminate(child).await;
                    out_task.abort();
                    return Err(SandboxError::OutputLimit {
                        stream: "stderr",
                        limit_bytes: OUTPUT_CAP_BYTES,
                    });
                }
                err_buf = Some(buf);
            }
            // `Child::wait` is cancel-safe, so re-creating the future each
            // loop iteration loses nothing.
            waited = child.wait() => {
                break waited?;
            }
        }
    };

    // The process exited; readers finish at EOF on the buffered remainder.
    let stdout = match out_buf {
        Some(buf) => buf,
        None => {
            let (buf, capped) = out_task.await.unwrap_or_default();
            if capped {
                return Err(SandboxError::OutputLimit {
                    stream: "stdout",
                    limit_bytes: OUTPUT_CAP_BYTES,
                });
            }
            buf
        }
    };
    let stderr = match err_buf {
        Some(buf) => buf,
        None => {
            let (buf, capped) = err_task.await.unwrap_or_default();
            if capped {
                return Err(SandboxError::OutputLimit {
                    stream: "stderr",
                    limit_bytes: OUTPUT_CAP_BYTES,
                });
            }
            buf
        }
    };

    Ok((
        status,
        String::from_utf8_lossy(&stdout).to_string(),
        String::from_utf8_lossy(&stderr).to_string(),
    ))
}

/// Read a stream until EOF or the cap; stops reading past the cap so a
/// looping program cannot exhaust host memory through the pipe.
async fn read_capped<R>(mut reader: R) -> (Vec<u8>, bool)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => return (buf, false),
            Ok(n) => {
                if buf.len() + n > OUTPUT_CAP_BYTES {
                    buf.extend_from_slice(&chunk[..OUTPUT_CAP_BYTES - buf.len()]);
                    return (buf, true);
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(_) => return (buf, false),
        }
    }
}

async fn terminate(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        debug!(error = %err, "kill failed (process already gone?)");
    }
    if let Err(err) = child.wait().await {
        debug!(error = %err, "reap after kill failed");
    }
}

/// Remove the container named by the cidfile, if the engine got far enough
/// to write one. Best-effort: failures are logged, never escalated.
async fn remove_container(engine: &str, cidfile: &std::path::Path) {
    let Ok(contents) = std::fs::read_to_string(cidfile) else {
        return;
    };
    let Some(id) = contents.split_whitespace().next().filter(|s| !s.is_empty()) else {
        return;
    };

    let removed = Command::new(engine)
        .args(["rm", "--force", id])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match removed {
        Ok(status) if status.success() => debug!(container = %id, "removed container"),
        Ok(status) => warn!(container = %id, code = ?status.code(), "container removal exited non-zero"),
        Err(err) => warn!(container = %id, error = %err, "container removal failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_language_fails_immediately() {
        let provider = LocalProvider::new();
        let options = SandboxRunOptions::new(Language::Rust, "fn main() {}");
        let result = provider.run(&options).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert!(result.error.as_deref().unwrap_or("").contains("rust"));
    }

    #[test]
    fn test_unknown_language_is_unsupported() {
        let provider = LocalProvider::new();
        assert!(!provider.supports(Language::Unknown));
        assert!(!provider.supports(Language::Go));
        assert!(provider.supports(Language::Python));
        assert!(provider.supports(Language::TypeScript));
    }

    #[tokio::test]
    async fn test_cleanup_is_safe_without_run() {
        let provider = LocalProvider::new();
        provider.cleanup().await;
        provider.cleanup().await;
    }

    #[test]
    fn test_availability_cache_reset() {
        let _guard = crate::sandbox::testutil::process_state_guard();
        cache_availability(false);
        assert_eq!(cached_availability(), Some(false));
        reset_availability_cache();
        assert_eq!(cached_availability(), None);
    }

    #[tokio::test]
    async fn test_read_capped_stops_at_cap() {
        let data = vec![b'a'; OUTPUT_CAP_BYTES + 100];
        let (buf, capped) = read_capped(&data[..]).await;
        assert!(capped);
        assert_eq!(buf.len(), OUTPUT_CAP_BYTES);
    }

    #[tokio::test]
    async fn test_read_capped_small_stream() {
        let data = b"hello".to_vec();
        let (buf, capped) = read_capped(&data[..]).await;
        assert!(!capped);
        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn test_supervise_reports_timeout() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn sleep");

        let outcome = supervise(&mut child, Duration::from_millis(100)).await;
        assert!(matches!(outcome, Err(SandboxError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_supervise_captures_both_streams() {
        let mut child = Command::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn sh");

        let (status, stdout, stderr) = supervise(&mut child, Duration::from_secs(5))
            .await
            .expect("supervise");
        assert_eq!(status.code(), Some(3));
        assert!(stdout.contains("out"));
        assert!(stderr.contains("err"));
    }

    #[tokio::test]
    async fn test_supervise_kills_on_output_cap() {
        // `yes` floods stdout far past the cap.
        let mut child = Command::new("sh")
            .args(["-c", "yes codevet"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn yes");

        let outcome = supervise(&mut child, Duration::from_secs(30)).await;
        match outcome {
            Err(SandboxError::OutputLimit { stream, .. }) => assert_eq!(stream, "stdout"),
            other => panic!("expected OutputLimit, got {other:?}"),
        }
    }
}
