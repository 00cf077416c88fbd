//! YAML frontmatter parsing for policy markdown files.
//!
//! `AGENTS.md`, `SKILL.md` and subagent definitions all share the same
//! shape: an optional YAML block delimited by `---` at the top of the
//! file, followed by a markdown body.

use serde::de::DeserializeOwned;

/// Split a markdown document into parsed frontmatter and body.
///
/// Returns `(None, whole document)` when there is no frontmatter block or
/// the YAML fails to deserialize — the caller decides whether that is a
/// warning (skills, subagents) or simply a plain file (AGENTS.md without
/// defaults).
pub fn parse<T: DeserializeOwned>(content: &str) -> (Option<T>, String) {
    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return (None, content.to_string());
    }

    let after_open = &trimmed[3..];
    let Some(close_idx) = after_open.find("\n---") else {
        return (None, content.to_string());
    };

    let yaml_str = &after_open[..close_idx];
    let body = after_open[close_idx + 4..].trim_start_matches('\n').to_string();

    match serde_yaml::from_str::<T>(yaml_str) {
        Ok(parsed) => (Some(parsed), body),
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse policy frontmatter");
            (None, content.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Meta {
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
    }

    #[test]
    fn parses_frontmatter_and_body() {
        let md = "---\nname: planner\ndescription: plans work\n---\n# Planner\nBody text.";
        let (meta, body) = parse::<Meta>(md);
        let meta = meta.unwrap();
        assert_eq!(meta.name.as_deref(), Some("planner"));
        assert_eq!(meta.description.as_deref(), Some("plans work"));
        assert!(body.starts_with("# Planner"));
    }

    #[test]
    fn no_frontmatter_returns_whole_document() {
        let md = "# Just markdown\nNo frontmatter here.";
        let (meta, body) = parse::<Meta>(md);
        assert!(meta.is_none());
        assert_eq!(body, md);
    }

    #[test]
    fn unterminated_frontmatter_is_not_parsed() {
        let md = "---\nname: broken";
        let (meta, body) = parse::<Meta>(md);
        assert!(meta.is_none());
        assert_eq!(body, md);
    }

    #[test]
    fn invalid_yaml_falls_back_to_plain_body() {
        let md = "---\nname: [unclosed\n---\nbody";
        let (meta, body) = parse::<Meta>(md);
        assert!(meta.is_none());
        assert_eq!(body, md);
    }
}
