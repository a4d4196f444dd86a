//! Core domain types: blocks, issues, results, errors.
//!
//! Everything here is created fresh for a single `verify` call and
//! discarded afterward; the only process-wide state in the crate is the
//! sandbox availability cache (see [`crate::sandbox`]).

pub mod block;
pub mod error;
pub mod issue;
pub mod result;

pub use block::{CodeBlock, Language};
pub use error::{CodevetError, Result};
pub use issue::{Issue, IssueSource, Severity};
pub use result::{CodeBlockResult, ExecutionResult, VerifyResult, VerifyStats};
