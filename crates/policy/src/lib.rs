//! `codial-policy` — workspace policy loading and user-managed rules.
//!
//! This crate provides:
//! - A [`PolicyLoader`] that merges the layered policy sources (`RULES.md`,
//!   `CODIAL.md`, `AGENTS.md`, skills, subagent definitions) into an
//!   immutable, content-hashed [`PolicySnapshot`].
//! - A [`RulesStore`] for the user-managed `CODIAL.md` rule list with
//!   atomic file rewrites.

pub mod frontmatter;
pub mod loader;
pub mod rules;
pub mod types;

pub use loader::PolicyLoader;
pub use rules::RulesStore;
pub use types::{AgentDefaults, PolicySnapshot, SkillSummary, SubagentDef};
