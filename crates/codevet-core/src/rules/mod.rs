//! Rules: named, language-scoped checks over code blocks.
//!
//! A [`Rule`] carries a per-line pattern and/or a custom predicate; the
//! engine applies a rule list to one block and emits [`crate::domain::Issue`]s.
//! The catalogue ships the built-in `security` and `quality` sets.

pub mod catalog;
pub mod engine;
pub mod rule;

pub use catalog::{resolve_rules, RuleSelection};
pub use engine::run_rules;
pub use rule::{Rule, RuleBuilder, RuleCheckFn, RuleMatch};
