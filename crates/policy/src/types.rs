//! Policy snapshot value objects.

use serde::{Deserialize, Serialize};

/// Session-seeding defaults declared in `AGENTS.md` frontmatter.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AgentDefaults {
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub default_mcp_enabled: Option<bool>,
    #[serde(default)]
    pub default_mcp_profile: Option<String>,
}

/// A skill surfaced to the provider as part of the system context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
}

/// A named subagent profile selectable per session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubagentDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Model override for turns run under this profile.
    #[serde(default)]
    pub model: Option<String>,
    /// The markdown body of the definition file.
    pub profile: String,
}

/// Immutable aggregate of the merged policy sources.
///
/// Produced on demand by the loader and owned by one turn-engine
/// invocation; never persisted. Two snapshots over an unchanged
/// filesystem have identical `content_hash`es.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySnapshot {
    /// Merged instruction text (system defaults, global/workspace chains,
    /// `RULES.md`, `CODIAL.md`), in layering order.
    pub merged_rules: String,
    /// `AGENTS.md` body text, if present.
    pub agents_text: Option<String>,
    pub defaults: AgentDefaults,
    pub skills: Vec<SkillSummary>,
    pub subagents: Vec<SubagentDef>,
    /// SHA-256 over the snapshot content, hex-encoded.
    pub content_hash: String,
}

impl PolicySnapshot {
    pub fn subagent(&self, name: &str) -> Option<&SubagentDef> {
        self.subagents.iter().find(|s| s.name == name)
    }

    pub fn has_subagent(&self, name: &str) -> bool {
        self.subagent(name).is_some()
    }

    /// Serialize the snapshot into the provider-agnostic system context
    /// blob, optionally scoped to a subagent profile.
    pub fn system_context(&self, subagent: Option<&SubagentDef>) -> String {
        let mut out = String::new();
        out.push_str(&self.merged_rules);

        if let Some(agents) = &self.agents_text {
            if !agents.trim().is_empty() {
                out.push_str("\n\n## Agent profiles\n\n");
                out.push_str(agents);
            }
        }

        if !self.skills.is_empty() {
            out.push_str("\n\n## Available skills\n\n");
            for skill in &self.skills {
                out.push_str(&format!("- {}: {}\n", skill.name, skill.description));
            }
        }

        if let Some(sub) = subagent {
            out.push_str(&format!("\n\n## Active subagent: {}\n\n", sub.name));
            out.push_str(&sub.profile);
        }

        out
    }
}
