//! Layered policy loading.
//!
//! Sources, lowest to highest precedence:
//! system defaults → user-global chain (`~/.claude/CLAUDE.md`) →
//! workspace-upward chain → `AGENTS.md` → `RULES.md` ∪ `CODIAL.md` →
//! skills (`.claude/skills/*/SKILL.md`, `skills/*.yaml`) → subagent
//! definitions (`~/.claude/agents/*.md`, `<workspace>/.claude/agents/*.md`).
//!
//! The loader is pure on its input files: repeated calls over an unchanged
//! filesystem yield byte-identical snapshots, so the content hash can be
//! used for change detection. Missing optional files are not errors;
//! malformed frontmatter logs a warning and skips that skill or agent.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use codial_domain::error::Result;

use crate::frontmatter;
use crate::types::{AgentDefaults, PolicySnapshot, SkillSummary, SubagentDef};

/// Baseline instructions prepended to every snapshot.
const SYSTEM_DEFAULTS: &str = "You are a coding agent operating inside a \
Discord session channel. Follow the workspace rules below; prefer small, \
verifiable steps and report progress as you work.";

#[derive(Debug, Deserialize, Default)]
struct SkillFrontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SubagentFrontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

pub struct PolicyLoader {
    workspace_root: PathBuf,
    /// User home directory for the global chains. Overridable in tests.
    home_dir: Option<PathBuf>,
}

impl PolicyLoader {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            home_dir: std::env::var("HOME").ok().map(PathBuf::from),
        }
    }

    /// Use an explicit home directory instead of `$HOME` (tests).
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Assemble a fresh snapshot from the filesystem.
    pub fn load(&self) -> Result<PolicySnapshot> {
        let mut merged = String::from(SYSTEM_DEFAULTS);

        // ── User-global chain ────────────────────────────────────────
        if let Some(home) = &self.home_dir {
            append_section(&mut merged, read_optional(&home.join(".claude/CLAUDE.md")));
        }

        // ── Workspace-upward chain (outermost ancestor first) ────────
        let mut ancestors: Vec<&Path> = self.workspace_root.ancestors().skip(1).collect();
        ancestors.reverse();
        for dir in ancestors {
            append_section(&mut merged, read_optional(&dir.join("CLAUDE.md")));
        }
        append_section(
            &mut merged,
            read_optional(&self.workspace_root.join("CLAUDE.md")),
        );

        // ── AGENTS.md (body joins the context; frontmatter seeds sessions)
        let (defaults, agents_text) =
            match read_optional(&self.workspace_root.join("AGENTS.md")) {
                Some(raw) => {
                    let (fm, body) = frontmatter::parse::<AgentDefaults>(&raw);
                    (fm.unwrap_or_default(), Some(body))
                }
                None => (AgentDefaults::default(), None),
            };

        // ── RULES.md ∪ CODIAL.md ─────────────────────────────────────
        append_section(&mut merged, read_optional(&self.workspace_root.join("RULES.md")));
        append_section(
            &mut merged,
            read_optional(&self.workspace_root.join("CODIAL.md")),
        );

        let skills = self.load_skills();
        let subagents = self.load_subagents();

        let content_hash = snapshot_hash(&merged, &agents_text, &skills, &subagents);

        Ok(PolicySnapshot {
            merged_rules: merged,
            agents_text,
            defaults,
            skills,
            subagents,
            content_hash,
        })
    }

    // ── Skills ───────────────────────────────────────────────────────

    fn load_skills(&self) -> Vec<SkillSummary> {
        let mut skills = Vec::new();

        // `.claude/skills/<name>/SKILL.md` — frontmatter carries name + description.
        let packs_root = self.workspace_root.join(".claude/skills");
        for dir in sorted_entries(&packs_root) {
            if !dir.is_dir() {
                continue;
            }
            let md_path = dir.join("SKILL.md");
            let Some(raw) = read_optional(&md_path) else {
                continue;
            };
            let (fm, _body) = frontmatter::parse::<SkillFrontmatter>(&raw);
            match fm {
                Some(fm) => skills.push(SkillSummary {
                    name: fm.name.unwrap_or_else(|| dir_name(&dir)),
                    description: fm.description.unwrap_or_default(),
                }),
                None => {
                    tracing::warn!(path = %md_path.display(), "skipping skill with malformed frontmatter");
                }
            }
        }

        // `skills/*.yaml` — flat YAML skill summaries.
        let yaml_root = self.workspace_root.join("skills");
        for path in sorted_entries(&yaml_root) {
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Some(raw) = read_optional(&path) else {
                continue;
            };
            match serde_yaml::from_str::<SkillFrontmatter>(&raw) {
                Ok(fm) => skills.push(SkillSummary {
                    name: fm.name.unwrap_or_else(|| {
                        path.file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    }),
                    description: fm.description.unwrap_or_default(),
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed skill yaml");
                }
            }
        }

        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    // ── Subagents ────────────────────────────────────────────────────

    /// Workspace definitions override user-global ones of the same name.
    fn load_subagents(&self) -> Vec<SubagentDef> {
        let mut subagents: Vec<SubagentDef> = Vec::new();

        let mut roots = Vec::new();
        if let Some(home) = &self.home_dir {
            roots.push(home.join(".claude/agents"));
        }
        roots.push(self.workspace_root.join(".claude/agents"));

        for root in roots {
            for path in sorted_entries(&root) {
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                let Some(raw) = read_optional(&path) else {
                    continue;
                };
                let (fm, body) = frontmatter::parse::<SubagentFrontmatter>(&raw);
                let Some(fm) = fm else {
                    tracing::warn!(path = %path.display(), "skipping subagent with malformed frontmatter");
                    continue;
                };
                let name = fm.name.unwrap_or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default()
                });
                let def = SubagentDef {
                    name: name.clone(),
                    description: fm.description.unwrap_or_default(),
                    model: fm.model,
                    profile: body,
                };
                if let Some(existing) = subagents.iter_mut().find(|s| s.name == name) {
                    *existing = def;
                } else {
                    subagents.push(def);
                }
            }
        }

        subagents.sort_by(|a, b| a.name.cmp(&b.name));
        subagents
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn read_optional(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

fn append_section(merged: &mut String, content: Option<String>) {
    if let Some(text) = content {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            merged.push_str("\n\n");
            merged.push_str(trimmed);
        }
    }
}

/// Directory entries in a stable (sorted) order, for determinism.
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut entries: Vec<PathBuf> = read_dir.filter_map(|e| e.ok().map(|e| e.path())).collect();
    entries.sort();
    entries
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn snapshot_hash(
    merged: &str,
    agents_text: &Option<String>,
    skills: &[SkillSummary],
    subagents: &[SubagentDef],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(merged.as_bytes());
    hasher.update([0u8]);
    if let Some(agents) = agents_text {
        hasher.update(agents.as_bytes());
    }
    for skill in skills {
        hasher.update([0u8]);
        hasher.update(skill.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(skill.description.as_bytes());
    }
    for sub in subagents {
        hasher.update([0u8]);
        hasher.update(sub.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(sub.profile.as_bytes());
    }
    hex::encode(hasher.finalize())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn loader_for(ws: &Path, home: &Path) -> PolicyLoader {
        PolicyLoader::new(ws).with_home(home)
    }

    #[test]
    fn missing_files_produce_a_minimal_snapshot() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        assert!(snap.merged_rules.contains("coding agent"));
        assert!(snap.skills.is_empty());
        assert!(snap.subagents.is_empty());
        assert_eq!(snap.defaults, AgentDefaults::default());
    }

    #[test]
    fn repeated_loads_hash_identically() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(ws.path(), "RULES.md", "Always run the tests.");
        write(ws.path(), "CODIAL.md", "Prefer small diffs.");

        let loader = loader_for(ws.path(), home.path());
        let a = loader.load().unwrap();
        let b = loader.load().unwrap();
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.merged_rules, b.merged_rules);
    }

    #[test]
    fn content_change_changes_hash() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(ws.path(), "RULES.md", "v1");
        let loader = loader_for(ws.path(), home.path());
        let a = loader.load().unwrap();
        write(ws.path(), "RULES.md", "v2");
        let b = loader.load().unwrap();
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn agents_frontmatter_seeds_defaults() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(
            ws.path(),
            "AGENTS.md",
            "---\ndefault_provider: github-copilot-sdk\ndefault_model: gpt-4o\ndefault_mcp_enabled: true\ndefault_mcp_profile: dev\n---\n# Profiles\n",
        );
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        assert_eq!(
            snap.defaults.default_provider.as_deref(),
            Some("github-copilot-sdk")
        );
        assert_eq!(snap.defaults.default_mcp_enabled, Some(true));
        assert!(snap.agents_text.unwrap().starts_with("# Profiles"));
    }

    #[test]
    fn rules_and_codial_are_both_merged() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(ws.path(), "RULES.md", "rule-from-rules");
        write(ws.path(), "CODIAL.md", "rule-from-codial");
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        let rules_idx = snap.merged_rules.find("rule-from-rules").unwrap();
        let codial_idx = snap.merged_rules.find("rule-from-codial").unwrap();
        assert!(rules_idx < codial_idx, "CODIAL.md overrides RULES.md");
    }

    #[test]
    fn user_global_chain_is_included() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(home.path(), ".claude/CLAUDE.md", "global-preference");
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        assert!(snap.merged_rules.contains("global-preference"));
    }

    #[test]
    fn skills_are_discovered_from_both_roots() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(
            ws.path(),
            ".claude/skills/deploy/SKILL.md",
            "---\nname: deploy\ndescription: ship it\n---\nSteps.",
        );
        write(ws.path(), "skills/review.yaml", "name: review\ndescription: review code\n");
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        let names: Vec<_> = snap.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["deploy", "review"]);
    }

    #[test]
    fn malformed_skill_is_skipped_not_fatal() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(
            ws.path(),
            ".claude/skills/bad/SKILL.md",
            "---\nname: [broken\n---\nbody",
        );
        write(
            ws.path(),
            ".claude/skills/good/SKILL.md",
            "---\nname: good\ndescription: works\n---\nbody",
        );
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        assert_eq!(snap.skills.len(), 1);
        assert_eq!(snap.skills[0].name, "good");
    }

    #[test]
    fn workspace_subagent_overrides_user_global() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(
            home.path(),
            ".claude/agents/planner.md",
            "---\nname: planner\n---\nglobal profile",
        );
        write(
            ws.path(),
            ".claude/agents/planner.md",
            "---\nname: planner\nmodel: gpt-4o\n---\nworkspace profile",
        );
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        let planner = snap.subagent("planner").unwrap();
        assert_eq!(planner.profile, "workspace profile");
        assert_eq!(planner.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn system_context_includes_subagent_profile() {
        let ws = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(
            ws.path(),
            ".claude/agents/reviewer.md",
            "---\nname: reviewer\n---\nReview rigorously.",
        );
        let snap = loader_for(ws.path(), home.path()).load().unwrap();
        let ctx = snap.system_context(snap.subagent("reviewer"));
        assert!(ctx.contains("Active subagent: reviewer"));
        assert!(ctx.contains("Review rigorously."));
    }
}
