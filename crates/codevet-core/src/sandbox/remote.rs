//! Remote execution-service sandbox provider.
//!
//! Optional alternative to the local container engine: sends code to a
//! hosted execution service over HTTPS. One session is established lazily
//! on first use and reused for the life of the provider instance; racing
//! first users serialize on the session lock so exactly one session is
//! created. Availability detection is purely local (credential presence) —
//! it never performs a network call.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{ExecutionResult, Language};

use super::error::{SandboxError, SandboxResult};
use super::provider::{SandboxProvider, SandboxRunOptions};

const BASE_URL_VAR: &str = "CODEVET_SANDBOX_URL";
const TOKEN_VAR: &str = "CODEVET_SANDBOX_TOKEN";
const DEFAULT_BASE_URL: &str = "https://sandbox.codevet.io";

/// Margin added to the HTTP timeout so the service's own budget fires first.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    runtime: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    id: String,
}

#[derive(Debug, Serialize)]
struct ExecRequest<'a> {
    code: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    install: Vec<String>,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    env: std::collections::BTreeMap<String, String>,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ExecResponse {
    exit_code: i32,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
}

#[derive(Debug)]
struct RemoteSession {
    id: String,
}

/// Provider backed by a hosted execution service.
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: String,
    session: Mutex<Option<RemoteSession>>,
}

impl Default for RemoteProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteProvider {
    pub fn new() -> Self {
        let base_url = std::env::var(BASE_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: reqwest::Client::new(),
            base_url,
            session: Mutex::new(None),
        }
    }

    /// Cheap, local availability check: credential present and non-empty.
    pub fn is_available() -> bool {
        std::env::var(TOKEN_VAR)
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }

    fn token() -> SandboxResult<String> {
        std::env::var(TOKEN_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(SandboxError::CredentialMissing { var: TOKEN_VAR })
    }

    /// Create the session if none exists yet. Caller holds the session lock,
    /// so concurrent first users wait here rather than racing.
    async fn ensure_session(
        &self,
        slot: &mut Option<RemoteSession>,
        token: &str,
    ) -> SandboxResult<String> {
        if let Some(session) = slot.as_ref() {
            return Ok(session.id.clone());
        }

        let created: SessionCreated = self
            .client
            .post(format!("{}/v1/sessions", self.base_url))
            .bearer_auth(token)
            .json(&CreateSessionRequest { runtime: "multi" })
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| SandboxError::Session(format!("session create failed: {e}")))?
            .error_for_status()
            .map_err(|e| SandboxError::Session(format!("session create rejected: {e}")))?
            .json()
            .await
            .map_err(|e| SandboxError::Session(format!("session create returned bad JSON: {e}")))?;

        debug!(session = %created.id, "remote session established");
        let id = created.id.clone();
        *slot = Some(RemoteSession { id: created.id });
        Ok(id)
    }

    async fn run_inner(&self, options: &SandboxRunOptions) -> SandboxResult<ExecutionResult> {
        if !self.supports(options.language) {
            return Err(SandboxError::UnsupportedLanguage(options.language));
        }

        // Fails closed before any session work when the credential is gone.
        let token = Self::token()?;

        // The session is held for the whole call: the service allows one
        // in-flight execution per session, so access is serialized here.
        let mut slot = self.session.lock().await;
        let session_id = self.ensure_session(&mut slot, &token).await?;

        let start = Instant::now();
        let request = ExecRequest {
            code: &options.code,
            language: options.language.name(),
            install: options.install.clone(),
            env: options.env.clone(),
            timeout_secs: options.timeout_secs,
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/sessions/{}/exec",
                self.base_url, session_id
            ))
            .bearer_auth(&token)
            .json(&request)
            .timeout(Duration::from_secs(options.timeout_secs) + HTTP_TIMEOUT_MARGIN)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SandboxError::Timeout {
                        limit_secs: options.timeout_secs,
                    }
                } else {
                    SandboxError::Session(format!("exec request failed: {e}"))
                }
            })?
            .error_for_status()
            .map_err(|e| SandboxError::Session(format!("exec rejected: {e}")))?;

        let exec: ExecResponse = response
            .json()
            .await
            .map_err(|e| SandboxError::Session(format!("exec returned bad JSON: {e}")))?;

        Ok(ExecutionResult::completed(
            exec.stdout,
            exec.stderr,
            exec.exit_code,
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[async_trait]
impl SandboxProvider for RemoteProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    /// The hosted service runs a smaller language set than the local engine.
    fn supports(&self, language: Language) -> bool {
        matches!(language, Language::Python | Language::JavaScript)
    }

    async fn run(&self, options: &SandboxRunOptions) -> ExecutionResult {
        let start = Instant::now();
        match self.run_inner(options).await {
            Ok(result) => result,
            Err(err) => {
                debug!(language = %options.language, error = %err, "remote run failed");
                ExecutionResult::failed(err.to_string(), start.elapsed().as_millis() as u64)
            }
        }
    }

    /// Tear down the remote session if one was created. Idempotent.
    async fn cleanup(&self) {
        let mut slot = self.session.lock().await;
        let Some(session) = slot.take() else {
            return;
        };

        let token = match Self::token() {
            Ok(token) => token,
            Err(_) => return,
        };

        let deleted = self
            .client
            .delete(format!("{}/v1/sessions/{}", self.base_url, session.id))
            .bearer_auth(&token)
            .timeout(Duration::from_secs(10))
            .send()
            .await;
        match deleted {
            Ok(response) if response.status().is_success() => {
                debug!(session = %session.id, "remote session closed");
            }
            Ok(response) => {
                debug!(session = %session.id, status = %response.status(), "session close rejected");
            }
            Err(err) => {
                debug!(session = %session.id, error = %err, "session close failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var manipulation in these tests is serialized to avoid cross-test
    // interference (the credential is process-global state).
    use crate::sandbox::testutil::process_state_guard as env_guard;

    #[test]
    fn test_is_available_tracks_credential() {
        let _guard = env_guard();
        std::env::remove_var(TOKEN_VAR);
        assert!(!RemoteProvider::is_available());

        std::env::set_var(TOKEN_VAR, "tok-123");
        assert!(RemoteProvider::is_available());

        std::env::set_var(TOKEN_VAR, "   ");
        assert!(!RemoteProvider::is_available());

        std::env::remove_var(TOKEN_VAR);
    }

    #[tokio::test]
    async fn test_run_fails_closed_without_credential() {
        let _guard = env_guard();
        std::env::remove_var(TOKEN_VAR);

        let provider = RemoteProvider::new();
        let options = SandboxRunOptions::new(Language::Python, "print(1)");
        let result = provider.run(&options).await;
        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap_or("")
            .contains(TOKEN_VAR));
    }

    #[tokio::test]
    async fn test_unsupported_language_fails_without_session() {
        let _guard = env_guard();
        // Even with a credential set, an unsupported language never reaches
        // session establishment.
        std::env::set_var(TOKEN_VAR, "tok-123");

        let provider = RemoteProvider::new();
        let options = SandboxRunOptions::new(Language::Bash, "echo hi");
        let result = provider.run(&options).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("bash"));
        assert!(provider.session.lock().await.is_none());

        std::env::remove_var(TOKEN_VAR);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent_without_session() {
        let provider = RemoteProvider::new();
        provider.cleanup().await;
        provider.cleanup().await;
    }

    #[test]
    fn test_exec_response_tolerates_missing_streams() {
        let json = r#"{"exit_code": 0}"#;
        let response: ExecResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.exit_code, 0);
        assert_eq!(response.stdout, "");
    }
}
