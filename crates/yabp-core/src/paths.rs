use crate::error::{Result, YabpError};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

/// Per-project state directory.
pub const YABP_DIR: &str = ".yabp";
pub const EXECUTIONS_DIR: &str = ".yabp/executions";
pub const DELETED_DIR: &str = ".deleted";
pub const DOCS_DIR: &str = "docs";

pub const PROJECT_CONFIG_FILE: &str = ".yabp/config.json";
pub const CONTEXT_FILE: &str = ".yabp/context.json";
pub const PROMPTS_FILE: &str = ".yabp/prompts.md";
pub const README_FILE: &str = "README.md";

pub const AGENT_METADATA_FILE: &str = "metadata.yaml";
pub const AGENT_PROMPTS_DIR: &str = "prompts";
pub const RULES_FILE: &str = "selection_rules.yaml";

pub const GLOBAL_CONFIG_FILE: &str = "config/global.json";
pub const REGISTRY_FILE: &str = "config/projects.json";

/// Entries hidden from the project file browser.
pub const NOISE_ENTRIES: &[&str] = &[YABP_DIR, "node_modules", ".git", ".DS_Store"];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(PROJECT_CONFIG_FILE)
}

pub fn context_path(root: &Path) -> PathBuf {
    root.join(CONTEXT_FILE)
}

pub fn executions_dir(root: &Path) -> PathBuf {
    root.join(EXECUTIONS_DIR)
}

pub fn agent_dir(agents_dir: &Path, id: &str) -> PathBuf {
    agents_dir.join(id)
}

pub fn agent_metadata(agents_dir: &Path, id: &str) -> PathBuf {
    agent_dir(agents_dir, id).join(AGENT_METADATA_FILE)
}

pub fn agent_prompts_dir(agents_dir: &Path, id: &str) -> PathBuf {
    agent_dir(agents_dir, id).join(AGENT_PROMPTS_DIR)
}

pub fn global_config_path(home: &Path) -> PathBuf {
    home.join(GLOBAL_CONFIG_FILE)
}

pub fn registry_path(home: &Path) -> PathBuf {
    home.join(REGISTRY_FILE)
}

/// `docs/<folder>/`, used both for output-location footers and simulated
/// writes. A folder already rooted at `docs/` is not prefixed twice.
pub fn docs_prefix(folder: &str) -> String {
    let folder = folder.trim().trim_matches('/');
    let folder = folder
        .strip_prefix("docs/")
        .unwrap_or(folder)
        .trim_end_matches('/');
    format!("{DOCS_DIR}/{folder}/")
}

/// Join a caller-supplied relative path onto `root`, rejecting anything that
/// would escape it.
pub fn join_relative(root: &Path, rel: &str) -> Result<PathBuf> {
    let candidate = Path::new(rel);
    if rel.is_empty() || rel.contains('\0') {
        return Err(YabpError::InvalidPath(rel.to_string()));
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(YabpError::InvalidPath(rel.to_string())),
        }
    }
    Ok(root.join(candidate))
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
static ID_STRIP_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn id_strip_re() -> &'static Regex {
    ID_STRIP_RE.get_or_init(|| Regex::new(r"[^a-z0-9-]").unwrap())
}

/// Derive a stable agent identifier from its display name.
///
/// `"Senior Architect!"` becomes `"senior-architect"`.
pub fn agent_id_from_name(name: &str) -> Result<String> {
    let lower = name.trim().to_lowercase();
    let dashed = whitespace_re().replace_all(&lower, "-");
    let id = id_strip_re().replace_all(&dashed, "").into_owned();
    if !id.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(YabpError::InvalidName(name.to_string()));
    }
    Ok(id)
}

/// Replace every non-alphanumeric character with `_` (execution log names).
pub fn sanitize_for_filename(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// ISO-8601 UTC timestamp with `:` and `.` replaced by `-`, safe as a
/// filename prefix: `2024-05-01T10-20-30-123Z`.
pub fn timestamp_slug(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_ids_from_names() {
        assert_eq!(agent_id_from_name("DevOps Engineer").unwrap(), "devops-engineer");
        assert_eq!(agent_id_from_name("  QA  Engineer! ").unwrap(), "qa-engineer");
        assert_eq!(agent_id_from_name("C++ Guru").unwrap(), "c-guru");
    }

    #[test]
    fn agent_id_rejects_symbol_only_names() {
        assert!(agent_id_from_name("!!!").is_err());
        assert!(agent_id_from_name("").is_err());
    }

    #[test]
    fn docs_prefix_is_normalised() {
        assert_eq!(docs_prefix("qa"), "docs/qa/");
        assert_eq!(docs_prefix("qa/"), "docs/qa/");
        assert_eq!(docs_prefix("docs/qa"), "docs/qa/");
    }

    #[test]
    fn join_relative_rejects_escapes() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            join_relative(root, "docs/a.md").unwrap(),
            PathBuf::from("/tmp/proj/docs/a.md")
        );
        assert!(join_relative(root, "../etc/passwd").is_err());
        assert!(join_relative(root, "/etc/passwd").is_err());
        assert!(join_relative(root, "").is_err());
    }

    #[test]
    fn sanitize_replaces_symbols() {
        assert_eq!(sanitize_for_filename("qa-engineer"), "qa_engineer");
        assert_eq!(sanitize_for_filename("custom"), "custom");
    }

    #[test]
    fn timestamp_slug_has_no_colons_or_dots() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:20:30.123Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(timestamp_slug(&at), "2024-05-01T10-20-30-123Z");
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            project_config_path(root),
            PathBuf::from("/tmp/proj/.yabp/config.json")
        );
        assert_eq!(
            executions_dir(root),
            PathBuf::from("/tmp/proj/.yabp/executions")
        );
        assert_eq!(
            agent_metadata(Path::new("/agents"), "qa"),
            PathBuf::from("/agents/qa/metadata.yaml")
        );
    }
}
