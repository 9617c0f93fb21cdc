//! Template Store: agent definitions and their fragment files.
//!
//! The engine only needs the read side ([`TemplateStore`]). The filesystem
//! implementation also carries the agent-authoring operations (create,
//! metadata update, prompt save/delete, bundle import/export).
//!
//! Layout:
//!
//! ```text
//! <agents>/
//!   selection_rules.yaml        optional rule-set override
//!   <agent-id>/
//!     metadata.yaml
//!     prompts/*.md
//!     <category>/*.md           curated fragments (framework/, cicd/, ...)
//! ```

use crate::agent::Agent;
use crate::error::{Result, YabpError};
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait TemplateStore {
    /// All agents with readable metadata, sorted by id.
    fn list_agents(&self) -> Result<Vec<Agent>>;

    /// `Ok(None)` when the agent does not exist.
    fn load_agent(&self, id: &str) -> Result<Option<Agent>>;

    /// `Ok(None)` when the fragment does not exist.
    fn read_fragment(&self, agent_id: &str, relative_path: &str) -> Result<Option<String>>;

    /// Relative paths (with `/` separators) of every Markdown fragment the
    /// agent owns, sorted.
    fn list_fragments(&self, agent_id: &str) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Filesystem implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    agents_dir: PathBuf,
}

/// A file in an agent's `prompts/` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptFile {
    pub filename: String,
    pub id: String,
}

/// Portable single-file form of an agent: metadata plus every fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBundle {
    pub id: String,
    pub metadata: Agent,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl FsTemplateStore {
    pub fn new(agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
        }
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    pub fn require_agent(&self, id: &str) -> Result<Agent> {
        self.load_agent(id)?
            .ok_or_else(|| YabpError::AgentNotFound(id.to_string()))
    }

    pub fn save_agent(&self, agent: &Agent) -> Result<()> {
        let path = paths::agent_metadata(&self.agents_dir, &agent.id);
        io::atomic_write(&path, agent.to_yaml()?.as_bytes())
    }

    /// Create an empty agent shell named `name`.
    pub fn create_agent(
        &self,
        name: &str,
        role: Option<String>,
        category: Option<String>,
        icon: Option<String>,
    ) -> Result<Agent> {
        let mut agent = Agent::new(name)?;
        let dir = paths::agent_dir(&self.agents_dir, &agent.id);
        if dir.exists() {
            return Err(YabpError::AgentExists(agent.id));
        }
        if let Some(role) = role {
            agent.role = role;
        }
        if let Some(category) = category {
            agent.category = category;
        }
        if let Some(icon) = icon {
            agent.icon = icon;
        }
        io::ensure_dir(&paths::agent_prompts_dir(&self.agents_dir, &agent.id))?;
        self.save_agent(&agent)?;
        tracing::info!(agent = %agent.id, "created agent");
        Ok(agent)
    }

    pub fn update_metadata(&self, id: &str, patch: &serde_yaml::Mapping) -> Result<Agent> {
        let current = self.require_agent(id)?;
        let updated = current.merge(patch)?;
        self.save_agent(&updated)?;
        Ok(updated)
    }

    /// Files directly under `prompts/`.
    pub fn list_prompt_files(&self, id: &str) -> Result<Vec<PromptFile>> {
        let dir = paths::agent_prompts_dir(&self.agents_dir, id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = name.strip_suffix(".md") {
                files.push(PromptFile {
                    id: stem.to_string(),
                    filename: name.clone(),
                });
            }
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    pub fn read_prompt(&self, id: &str, filename: &str) -> Result<String> {
        let rel = prompt_rel_path(filename)?;
        self.read_fragment(id, &rel)?
            .ok_or_else(|| YabpError::FragmentNotFound {
                agent: id.to_string(),
                file: filename.to_string(),
            })
    }

    /// Write `prompts/<filename>` and register it in the agent's prompt list.
    pub fn save_prompt(&self, id: &str, filename: &str, content: &str) -> Result<()> {
        let rel = prompt_rel_path(filename)?;
        let path = paths::join_relative(&paths::agent_dir(&self.agents_dir, id), &rel)?;
        io::atomic_write(&path, content.as_bytes())?;

        if let Some(mut agent) = self.load_agent(id)? {
            if agent.register_prompt(stem(filename)) {
                self.save_agent(&agent)?;
            }
        }
        Ok(())
    }

    /// Remove `prompts/<filename>` (if present) and its prompt-list entry.
    pub fn delete_prompt(&self, id: &str, filename: &str) -> Result<()> {
        let rel = prompt_rel_path(filename)?;
        let path = paths::join_relative(&paths::agent_dir(&self.agents_dir, id), &rel)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        if let Some(mut agent) = self.load_agent(id)? {
            if agent.unregister_prompt(stem(filename)) {
                self.save_agent(&agent)?;
            }
        }
        Ok(())
    }

    pub fn export_bundle(&self, id: &str) -> Result<AgentBundle> {
        let metadata = self.require_agent(id)?;
        let mut files = BTreeMap::new();
        for rel in self.list_fragments(id)? {
            if let Some(content) = self.read_fragment(id, &rel)? {
                files.insert(rel, content);
            }
        }
        Ok(AgentBundle {
            id: id.to_string(),
            metadata,
            files,
        })
    }

    /// Install a bundle. Refuses to replace an existing agent unless
    /// `overwrite` is set; with `overwrite`, bundle files are written over
    /// the existing tree and unrelated files are kept.
    pub fn import_bundle(&self, bundle: &AgentBundle, overwrite: bool) -> Result<Agent> {
        let id = paths::agent_id_from_name(&bundle.id)?;
        let dir = paths::agent_dir(&self.agents_dir, &id);
        if dir.exists() && !overwrite {
            return Err(YabpError::AgentExists(id));
        }
        for (rel, content) in &bundle.files {
            let path = paths::join_relative(&dir, rel)?;
            io::atomic_write(&path, content.as_bytes())?;
        }
        io::ensure_dir(&paths::agent_prompts_dir(&self.agents_dir, &id))?;
        let mut agent = bundle.metadata.clone();
        agent.id = id;
        self.save_agent(&agent)?;
        tracing::info!(agent = %agent.id, files = bundle.files.len(), "imported agent bundle");
        Ok(agent)
    }
}

impl TemplateStore for FsTemplateStore {
    fn list_agents(&self) -> Result<Vec<Agent>> {
        if !self.agents_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut agents = Vec::new();
        for entry in std::fs::read_dir(&self.agents_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            match self.load_agent(&id) {
                Ok(Some(agent)) => agents.push(agent),
                Ok(None) => {}
                Err(e) => tracing::warn!(agent = %id, error = %e, "skipping unreadable agent"),
            }
        }
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    fn load_agent(&self, id: &str) -> Result<Option<Agent>> {
        let path = paths::agent_metadata(&self.agents_dir, id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(Agent::from_yaml(id, &data)?))
    }

    fn read_fragment(&self, agent_id: &str, relative_path: &str) -> Result<Option<String>> {
        let dir = paths::agent_dir(&self.agents_dir, agent_id);
        let path = paths::join_relative(&dir, relative_path)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    fn list_fragments(&self, agent_id: &str) -> Result<Vec<String>> {
        let dir = paths::agent_dir(&self.agents_dir, agent_id);
        let mut out = Vec::new();
        if dir.is_dir() {
            collect_markdown(&dir, "", &mut out)?;
        }
        out.sort();
        Ok(out)
    }
}

fn collect_markdown(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        if entry.file_type()?.is_dir() {
            collect_markdown(&entry.path(), &rel, out)?;
        } else if name.ends_with(".md") {
            out.push(rel);
        }
    }
    Ok(())
}

fn prompt_rel_path(filename: &str) -> Result<String> {
    if filename.is_empty() || filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(YabpError::InvalidPath(filename.to_string()));
    }
    Ok(format!("{}/{filename}", paths::AGENT_PROMPTS_DIR))
}

fn stem(filename: &str) -> &str {
    filename.strip_suffix(".md").unwrap_or(filename)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_agent;
    use tempfile::TempDir;

    #[test]
    fn create_agent_writes_shell() {
        let dir = TempDir::new().unwrap();
        let store = FsTemplateStore::new(dir.path());
        let agent = store
            .create_agent("Data Wrangler", Some("ETL".into()), None, None)
            .unwrap();
        assert_eq!(agent.id, "data-wrangler");
        assert!(dir.path().join("data-wrangler/prompts").is_dir());
        let loaded = store.require_agent("data-wrangler").unwrap();
        assert_eq!(loaded.role, "ETL");
        assert_eq!(loaded.name, "Data Wrangler");
    }

    #[test]
    fn create_agent_twice_fails() {
        let dir = TempDir::new().unwrap();
        let store = FsTemplateStore::new(dir.path());
        store.create_agent("QA", None, None, None).unwrap();
        assert!(matches!(
            store.create_agent("QA", None, None, None),
            Err(YabpError::AgentExists(_))
        ));
    }

    #[test]
    fn list_agents_skips_dirs_without_metadata() {
        let dir = TempDir::new().unwrap();
        write_agent(dir.path(), "b-agent", "name: B\n", &[]);
        write_agent(dir.path(), "a-agent", "name: A\n", &[]);
        std::fs::create_dir_all(dir.path().join("stray")).unwrap();
        let store = FsTemplateStore::new(dir.path());
        let ids: Vec<_> = store.list_agents().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a-agent", "b-agent"]);
    }

    #[test]
    fn list_fragments_is_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        write_agent(
            dir.path(),
            "devops",
            "name: DevOps\n",
            &[
                ("prompts/001_cicd_pipeline.md", "x"),
                ("infrastructure/aws_terraform_complete.md", "y"),
                ("notes.txt", "ignored"),
            ],
        );
        let store = FsTemplateStore::new(dir.path());
        assert_eq!(
            store.list_fragments("devops").unwrap(),
            vec![
                "infrastructure/aws_terraform_complete.md",
                "prompts/001_cicd_pipeline.md"
            ]
        );
        assert!(store.list_fragments("missing").unwrap().is_empty());
    }

    #[test]
    fn read_fragment_missing_is_none() {
        let dir = TempDir::new().unwrap();
        write_agent(dir.path(), "qa", "name: QA\n", &[("prompts/a.md", "A")]);
        let store = FsTemplateStore::new(dir.path());
        assert_eq!(store.read_fragment("qa", "prompts/a.md").unwrap().as_deref(), Some("A"));
        assert!(store.read_fragment("qa", "prompts/b.md").unwrap().is_none());
        assert!(store.read_fragment("qa", "../qa/prompts/a.md").is_err());
    }

    #[test]
    fn save_and_delete_prompt_maintain_prompt_list() {
        let dir = TempDir::new().unwrap();
        let store = FsTemplateStore::new(dir.path());
        store.create_agent("PM Framework", None, None, None).unwrap();

        store.save_prompt("pm-framework", "003_roadmap.md", "# Roadmap").unwrap();
        let agent = store.require_agent("pm-framework").unwrap();
        assert_eq!(agent.prompts.len(), 1);
        assert_eq!(agent.prompts[0].title, "003 Roadmap");
        assert_eq!(
            store.read_prompt("pm-framework", "003_roadmap.md").unwrap(),
            "# Roadmap"
        );
        assert_eq!(store.list_prompt_files("pm-framework").unwrap().len(), 1);

        // Saving again does not duplicate the entry.
        store.save_prompt("pm-framework", "003_roadmap.md", "# v2").unwrap();
        assert_eq!(store.require_agent("pm-framework").unwrap().prompts.len(), 1);

        store.delete_prompt("pm-framework", "003_roadmap.md").unwrap();
        assert!(store.require_agent("pm-framework").unwrap().prompts.is_empty());
        assert!(store.read_prompt("pm-framework", "003_roadmap.md").is_err());
    }

    #[test]
    fn save_prompt_rejects_nested_names() {
        let dir = TempDir::new().unwrap();
        let store = FsTemplateStore::new(dir.path());
        assert!(store.save_prompt("qa", "../evil.md", "x").is_err());
        assert!(store.save_prompt("qa", "a/b.md", "x").is_err());
    }

    #[test]
    fn update_metadata_merges() {
        let dir = TempDir::new().unwrap();
        let store = FsTemplateStore::new(dir.path());
        store.create_agent("QA", None, None, None).unwrap();
        let patch: serde_yaml::Mapping = serde_yaml::from_str("docs_folder: qa").unwrap();
        let updated = store.update_metadata("qa", &patch).unwrap();
        assert_eq!(updated.docs_folder.as_deref(), Some("qa"));
        assert!(store.update_metadata("nope", &patch).is_err());
    }

    #[test]
    fn bundle_roundtrip_between_stores() {
        let src = TempDir::new().unwrap();
        write_agent(
            src.path(),
            "qa",
            "name: QA\ndocs_folder: qa\n",
            &[("prompts/a.md", "A"), ("testing/pw.md", "PW")],
        );
        let bundle = FsTemplateStore::new(src.path()).export_bundle("qa").unwrap();
        assert_eq!(bundle.files.len(), 2);

        let dst = TempDir::new().unwrap();
        let store = FsTemplateStore::new(dst.path());
        let agent = store.import_bundle(&bundle, false).unwrap();
        assert_eq!(agent.docs_folder.as_deref(), Some("qa"));
        assert_eq!(store.read_fragment("qa", "testing/pw.md").unwrap().as_deref(), Some("PW"));

        assert!(matches!(
            store.import_bundle(&bundle, false),
            Err(YabpError::AgentExists(_))
        ));
        store.import_bundle(&bundle, true).unwrap();
    }
}
