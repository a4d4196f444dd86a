//! Provider detection and selection policy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CodevetError, Result};

use super::local::LocalProvider;
use super::provider::SandboxProvider;
use super::remote::RemoteProvider;

/// Caller preference for sandbox execution.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SandboxPreference {
    /// First viable provider: local, then remote, else none.
    #[default]
    Auto,
    /// No sandbox; static analysis only.
    Disabled,
    /// Local container engine, or a hard error if unavailable.
    Local,
    /// Remote execution service, or a hard error if unavailable.
    Remote,
}

impl SandboxPreference {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(SandboxPreference::Auto),
            "disabled" | "none" | "false" => Some(SandboxPreference::Disabled),
            "local" | "docker" => Some(SandboxPreference::Local),
            "remote" | "cloud" => Some(SandboxPreference::Remote),
            _ => None,
        }
    }
}

impl std::fmt::Display for SandboxPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SandboxPreference::Auto => "auto",
            SandboxPreference::Disabled => "disabled",
            SandboxPreference::Local => "local",
            SandboxPreference::Remote => "remote",
        };
        f.write_str(s)
    }
}

/// Resolve a preference to a provider, if any.
///
/// `Auto` degrades to `None` when nothing is viable and never errors. An
/// explicit preference errors when its provider is unavailable: a caller
/// who asked for a specific sandbox must not be silently downgraded.
pub async fn detect_provider(
    preference: SandboxPreference,
) -> Result<Option<Arc<dyn SandboxProvider>>> {
    match preference {
        SandboxPreference::Disabled => Ok(None),
        SandboxPreference::Auto => {
            let local = LocalProvider::new();
            if local.is_available().await {
                debug!("sandbox: local container engine detected");
                return Ok(Some(Arc::new(local)));
            }
            if RemoteProvider::is_available() {
                debug!("sandbox: remote execution service credential detected");
                return Ok(Some(Arc::new(RemoteProvider::new())));
            }
            debug!("sandbox: no provider available, static analysis only");
            Ok(None)
        }
        SandboxPreference::Local => {
            let local = LocalProvider::new();
            if local.is_available().await {
                Ok(Some(Arc::new(local)))
            } else {
                Err(CodevetError::UnavailableProvider {
                    name: "local".to_string(),
                    reason: "container engine not reachable; is docker running? \
                             (set CODEVET_CONTAINER_ENGINE to use another engine)"
                        .to_string(),
                })
            }
        }
        SandboxPreference::Remote => {
            if RemoteProvider::is_available() {
                Ok(Some(Arc::new(RemoteProvider::new())))
            } else {
                Err(CodevetError::UnavailableProvider {
                    name: "remote".to_string(),
                    reason: "credential missing; set CODEVET_SANDBOX_TOKEN".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_from_token() {
        assert_eq!(
            SandboxPreference::from_token("auto"),
            Some(SandboxPreference::Auto)
        );
        assert_eq!(
            SandboxPreference::from_token("Docker"),
            Some(SandboxPreference::Local)
        );
        assert_eq!(
            SandboxPreference::from_token("false"),
            Some(SandboxPreference::Disabled)
        );
        assert_eq!(SandboxPreference::from_token("qemu"), None);
    }

    #[test]
    fn test_preference_display_round_trip() {
        for pref in [
            SandboxPreference::Auto,
            SandboxPreference::Disabled,
            SandboxPreference::Local,
            SandboxPreference::Remote,
        ] {
            assert_eq!(SandboxPreference::from_token(&pref.to_string()), Some(pref));
        }
    }

    #[tokio::test]
    async fn test_disabled_detects_nothing() {
        let provider = detect_provider(SandboxPreference::Disabled)
            .await
            .expect("disabled never errors");
        assert!(provider.is_none());
    }

    #[tokio::test]
    async fn test_explicit_local_errors_when_engine_missing() {
        let _guard = crate::sandbox::testutil::process_state_guard();
        // Probe a nonexistent engine so the test does not depend on a
        // container engine being installed on the host.
        crate::sandbox::local::reset_availability_cache();
        std::env::set_var("CODEVET_CONTAINER_ENGINE", "codevet-nonexistent-engine");

        let err = detect_provider(SandboxPreference::Local)
            .await
            .map(|_| ())
            .expect_err("explicit preference must error");
        assert!(err.to_string().contains("local"));

        std::env::remove_var("CODEVET_CONTAINER_ENGINE");
        crate::sandbox::local::reset_availability_cache();
    }
}
