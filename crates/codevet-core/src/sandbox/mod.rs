//! Sandbox: isolated execution of untrusted code blocks.
//!
//! A [`SandboxProvider`] executes one block under strict resource and
//! security constraints and owns all external process/resource lifecycle.
//! Two variants conform: the local container engine (default) and a remote
//! execution service; [`detect_provider`] picks the first viable one.
//!
//! # Modules
//!
//! - [`provider`]  — `SandboxProvider` trait + `SandboxRunOptions`
//! - [`local`]     — container-engine provider, availability cache
//! - [`remote`]    — execution-service provider, lazy session
//! - [`detect`]    — `SandboxPreference` + selection policy
//! - [`transform`] — pre-execution source transforms
//! - [`error`]     — `SandboxError` / `SandboxResult`

pub mod detect;
pub mod error;
pub mod local;
pub mod provider;
pub mod remote;
pub mod transform;

pub use detect::{detect_provider, SandboxPreference};
pub use error::{SandboxError, SandboxResult};
pub use local::{reset_availability_cache, LocalProvider, OUTPUT_CAP_BYTES};
pub use provider::{SandboxProvider, SandboxRunOptions, DEFAULT_TIMEOUT_SECS};
pub use remote::RemoteProvider;

/// Serializes tests that touch the process-wide availability cache or the
/// engine/credential environment variables.
#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    pub fn process_state_guard() -> MutexGuard<'static, ()> {
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}
