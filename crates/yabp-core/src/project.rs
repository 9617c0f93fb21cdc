//! Projects: per-project configuration, context, file access and the
//! name → directory registry.
//!
//! ```text
//! <project>/
//!   README.md
//!   .yabp/config.json      ProjectConfig
//!   .yabp/context.json     free-form context
//!   .yabp/prompts.md       compiled catalogue
//!   .yabp/executions/      write-once execution logs
//!   .deleted/              soft-deleted files
//! ```

use crate::compiler::{self, ExecutablePolicy};
use crate::config::Settings;
use crate::error::{Result, YabpError};
use crate::rules::RuleSet;
use crate::selection::Selections;
use crate::store::TemplateStore;
use crate::workflow::WorkflowPhase;
use crate::{io, paths};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default, alias = "templates")]
    pub agents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selections: Option<Selections>,
    /// Storage override used when the project was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Vec<WorkflowPhase>>,
    /// Output of the last compile; only ever written together with it.
    #[serde(default)]
    pub executable_files: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys only the compiler may write.
const COMPILER_OWNED_KEYS: &[&str] = &["executableFiles", "executable_files"];

impl ProjectConfig {
    pub fn new(agents: Vec<String>, selections: Option<Selections>) -> Self {
        Self {
            agents,
            selections,
            ..Self::default()
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Top-level merge: every key in `patch` replaces the current value,
    /// except the compiler-owned executable list which is never patched.
    pub fn merge(&self, patch: &Map<String, Value>) -> Result<Self> {
        let mut current = match self.to_value()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (k, v) in patch {
            if COMPILER_OWNED_KEYS.contains(&k.as_str()) {
                tracing::warn!(key = %k, "ignoring compiler-owned key in config patch");
                continue;
            }
            current.insert(k.clone(), v.clone());
        }
        Ok(serde_json::from_value(Value::Object(current))?)
    }

    /// Whether a patch touches anything the compiled catalogue depends on.
    pub fn patch_affects_catalogue(patch: &Map<String, Value>) -> bool {
        ["agents", "templates", "selections"]
            .iter()
            .any(|k| patch.contains_key(*k))
    }

    /// `{...config, name}`: the variables visible to catalogue listings.
    pub fn variables(&self, project_name: &str) -> Result<Value> {
        let mut vars = match self.to_value()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        vars.insert("name".into(), Value::String(project_name.to_string()));
        Ok(Value::Object(vars))
    }

    /// `{...config, context, name}`: the variables visible to a run.
    pub fn variables_with_context(
        &self,
        project_name: &str,
        context: &Map<String, Value>,
    ) -> Result<Value> {
        let mut vars = self.variables(project_name)?;
        if let Value::Object(map) = &mut vars {
            map.insert("context".into(), Value::Object(context.clone()));
        }
        Ok(vars)
    }
}

// ---------------------------------------------------------------------------
// ProjectStore
// ---------------------------------------------------------------------------

pub trait ProjectStore {
    fn root(&self) -> &Path;

    /// Defaults when the project has no configuration yet.
    fn read_config(&self) -> Result<ProjectConfig>;

    fn write_config(&self, config: &ProjectConfig) -> Result<()>;

    /// `Ok(None)` when the file does not exist.
    fn read_file(&self, relative_path: &str) -> Result<Option<String>>;

    /// Creates parent directories as needed.
    fn write_file(&self, relative_path: &str, content: &str) -> Result<()>;

    /// The project context; empty when none has been stored.
    fn read_context(&self) -> Result<Map<String, Value>> {
        match self.read_file(paths::CONTEXT_FILE)? {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Ok(Map::new()),
        }
    }
}

/// A project directory on disk.
#[derive(Debug, Clone)]
pub struct FsProject {
    name: String,
    root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileNode {
    Directory {
        name: String,
        path: String,
        children: Vec<FileNode>,
    },
    File {
        name: String,
        path: String,
        executable: bool,
    },
}

impl FsProject {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_config(&self) -> bool {
        paths::project_config_path(&self.root).exists()
    }

    // -----------------------------------------------------------------------
    // Context
    // -----------------------------------------------------------------------

    /// Top-level merge of `patch` into the stored context.
    pub fn patch_context(&self, patch: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut context = self.read_context()?;
        for (k, v) in patch {
            context.insert(k.clone(), v.clone());
        }
        io::write_json(&paths::context_path(&self.root), &context)?;
        Ok(context)
    }

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------

    /// The project tree with bookkeeping directories filtered out. Files
    /// whose name appears in `executableFiles` are flagged.
    pub fn file_tree(&self) -> Result<Vec<FileNode>> {
        let executable = self.read_config()?.executable_files;
        walk(&self.root, "", &executable)
    }

    /// Move a file into `.deleted/` under a timestamped name. Returns the
    /// new name.
    pub fn soft_delete(&self, relative_path: &str) -> Result<String> {
        if relative_path.contains("..") {
            return Err(YabpError::InvalidPath(relative_path.to_string()));
        }
        let source = paths::join_relative(&self.root, relative_path)?;
        if !source.exists() {
            return Err(YabpError::FileNotFound(relative_path.to_string()));
        }

        let (dir, filename) = match relative_path.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, relative_path),
        };
        let stamp = paths::timestamp_slug(&Utc::now());
        let dest_name = match dir {
            Some(dir) => format!("{stamp}_{}_{filename}", dir.replace('/', "_")),
            None => format!("{stamp}_{filename}"),
        };

        let deleted_dir = self.root.join(paths::DELETED_DIR);
        io::ensure_dir(&deleted_dir)?;
        std::fs::rename(&source, deleted_dir.join(&dest_name))?;
        tracing::info!(project = %self.name, from = relative_path, to = %dest_name, "soft-deleted file");
        Ok(dest_name)
    }
}

fn walk(dir: &Path, prefix: &str, executable: &[String]) -> Result<Vec<FileNode>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut out = Vec::new();
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if paths::NOISE_ENTRIES.contains(&name.as_str()) {
            continue;
        }
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        if entry.file_type()?.is_dir() {
            let children = walk(&entry.path(), &path, executable)?;
            out.push(FileNode::Directory {
                name,
                path,
                children,
            });
        } else {
            let flagged = executable.contains(&name);
            out.push(FileNode::File {
                name,
                path,
                executable: flagged,
            });
        }
    }
    Ok(out)
}

impl ProjectStore for FsProject {
    fn root(&self) -> &Path {
        &self.root
    }

    fn read_config(&self) -> Result<ProjectConfig> {
        io::read_json_or_default(&paths::project_config_path(&self.root))
    }

    fn write_config(&self, config: &ProjectConfig) -> Result<()> {
        io::write_json(&paths::project_config_path(&self.root), config)
    }

    fn read_file(&self, relative_path: &str) -> Result<Option<String>> {
        let path = paths::join_relative(&self.root, relative_path)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    fn write_file(&self, relative_path: &str, content: &str) -> Result<()> {
        let path = paths::join_relative(&self.root, relative_path)?;
        io::atomic_write(&path, content.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Project name → directory (`config/projects.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry(BTreeMap<String, PathBuf>);

impl Registry {
    pub fn load(home: &Path) -> Result<Self> {
        io::read_json_or_default(&paths::registry_path(home))
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        io::write_json(&paths::registry_path(home), self)
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.0.get(name).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.0.insert(name.into(), path.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<PathBuf> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub path: PathBuf,
    pub config: ProjectConfig,
}

/// Where `name` lives: its registry entry, else `<defaultProjectPath>/<name>`.
pub fn locate(home: &Path, settings: &Settings, name: &str) -> Result<PathBuf> {
    let registry = Registry::load(home)?;
    Ok(match registry.get(name) {
        Some(path) => path.to_path_buf(),
        None => settings.default_project_path.join(name),
    })
}

/// Open an existing project directory.
pub fn open(home: &Path, settings: &Settings, name: &str) -> Result<FsProject> {
    let root = locate(home, settings, name)?;
    if !root.is_dir() {
        return Err(YabpError::ProjectNotFound(name.to_string()));
    }
    Ok(FsProject::new(name, root))
}

/// Every registered project with its configuration. Unreadable configs show
/// as defaults.
pub fn list(home: &Path) -> Result<Vec<ProjectSummary>> {
    let registry = Registry::load(home)?;
    let mut out = Vec::new();
    for (name, path) in registry.iter() {
        let project = FsProject::new(name, path);
        let config = project.read_config().unwrap_or_else(|e| {
            tracing::warn!(project = %name, error = %e, "failed to load project config");
            ProjectConfig::default()
        });
        out.push(ProjectSummary {
            name: name.clone(),
            path: path.clone(),
            config,
        });
    }
    Ok(out)
}

/// Inputs shared by operations that compile a project's catalogue.
pub struct CatalogueSources<'a> {
    pub store: &'a dyn TemplateStore,
    pub rules: &'a RuleSet,
    pub policy: &'a ExecutablePolicy,
}

/// Create (or regenerate) a project: directory under `projectPath` or the
/// default location, registry entry, compiled catalogue, config and README.
pub fn create(
    home: &Path,
    settings: &Settings,
    name: &str,
    config: ProjectConfig,
    sources: &CatalogueSources<'_>,
) -> Result<(FsProject, ProjectConfig)> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(YabpError::InvalidName(name.to_string()));
    }
    let base = config
        .project_path
        .clone()
        .unwrap_or_else(|| settings.default_project_path.clone());
    let root = base.join(name);
    io::ensure_dir(&root)?;

    let mut registry = Registry::load(home)?;
    registry.insert(name, &root);
    registry.save(home)?;

    let project = FsProject::new(name, root);
    let config = compiler::generate(&project, name, config, sources)?;
    tracing::info!(project = name, path = %project.root().display(), "created project");
    Ok((project, config))
}

/// Apply a top-level config patch. The catalogue is recompiled when the
/// patch touches agents or selections, otherwise only the config is saved.
pub fn configure(
    project: &FsProject,
    patch: &Map<String, Value>,
    sources: &CatalogueSources<'_>,
) -> Result<ProjectConfig> {
    if !project.has_config() {
        return Err(YabpError::ProjectNotFound(project.name().to_string()));
    }
    let merged = project.read_config()?.merge(patch)?;
    if ProjectConfig::patch_affects_catalogue(patch) {
        compiler::generate(project, project.name(), merged, sources)
    } else {
        project.write_config(&merged)?;
        Ok(merged)
    }
}

/// Drop a project from the registry. With `purge`, its directory is also
/// removed, but only when it sits under `defaultProjectPath`.
pub fn delete(home: &Path, settings: &Settings, name: &str, purge: bool) -> Result<bool> {
    let mut registry = Registry::load(home)?;
    let Some(path) = registry.remove(name) else {
        return Ok(false);
    };
    registry.save(home)?;

    if purge && path.exists() {
        if path.starts_with(&settings.default_project_path) && path != settings.default_project_path
        {
            std::fs::remove_dir_all(&path)?;
            tracing::info!(project = name, path = %path.display(), "removed project directory");
        } else {
            tracing::warn!(
                project = name,
                path = %path.display(),
                "project directory outside defaultProjectPath left in place"
            );
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn config_keeps_unknown_keys_and_legacy_alias() {
        let cfg: ProjectConfig = serde_json::from_value(json!({
            "templates": ["qa-engineer"],
            "selections": {"Testing Framework": ["Playwright"]},
            "stack": {"language": "go"},
        }))
        .unwrap();
        assert_eq!(cfg.agents, vec!["qa-engineer"]);
        let back = cfg.to_value().unwrap();
        assert_eq!(back["stack"]["language"], "go");
        assert_eq!(back["agents"][0], "qa-engineer");
        assert!(back["executableFiles"].is_array());
    }

    #[test]
    fn merge_is_top_level() {
        let cfg = ProjectConfig::new(vec!["a".into()], None);
        let merged = cfg
            .merge(&obj(json!({"agents": ["b"], "owner": "me"})))
            .unwrap();
        assert_eq!(merged.agents, vec!["b"]);
        assert_eq!(merged.extra["owner"], "me");
    }

    #[test]
    fn merge_ignores_executable_files() {
        let mut cfg = ProjectConfig::new(vec!["a".into()], None);
        cfg.executable_files = vec!["Setup.md".into()];
        let merged = cfg
            .merge(&obj(json!({
                "executableFiles": ["rm -rf.md"],
                "executable_files": ["other.md"],
                "owner": "me",
            })))
            .unwrap();
        assert_eq!(merged.executable_files, vec!["Setup.md"]);
        assert!(!merged.extra.contains_key("executable_files"));
        assert_eq!(merged.extra["owner"], "me");
    }

    #[test]
    fn variables_include_name_and_context() {
        let cfg = ProjectConfig::new(vec!["qa".into()], None);
        let ctx = obj(json!({"db": "postgres"}));
        let vars = cfg.variables_with_context("shop", &ctx).unwrap();
        assert_eq!(vars["name"], "shop");
        assert_eq!(vars["context"]["db"], "postgres");
        assert_eq!(vars["agents"][0], "qa");
    }

    #[test]
    fn context_patch_merges_top_level() {
        let dir = TempDir::new().unwrap();
        let project = FsProject::new("p", dir.path());
        assert!(project.read_context().unwrap().is_empty());
        project.patch_context(&obj(json!({"a": 1, "b": {"x": 1}}))).unwrap();
        let ctx = project.patch_context(&obj(json!({"b": {"y": 2}}))).unwrap();
        assert_eq!(ctx["a"], 1);
        assert_eq!(ctx["b"], json!({"y": 2}));
    }

    #[test]
    fn file_tree_filters_noise_and_flags_executables() {
        let dir = TempDir::new().unwrap();
        let project = FsProject::new("p", dir.path());
        let mut cfg = ProjectConfig::default();
        cfg.executable_files = vec!["Setup.md".into()];
        project.write_config(&cfg).unwrap();
        project.write_file("docs/Setup.md", "x").unwrap();
        project.write_file("README.md", "r").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();

        let tree = project.file_tree().unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree[0],
            FileNode::File {
                name: "README.md".into(),
                path: "README.md".into(),
                executable: false
            }
        );
        match &tree[1] {
            FileNode::Directory { children, .. } => assert_eq!(
                children[0],
                FileNode::File {
                    name: "Setup.md".into(),
                    path: "docs/Setup.md".into(),
                    executable: true
                }
            ),
            other => panic!("expected directory, got {other:?}"),
        }
    }

    #[test]
    fn read_write_files_stay_inside_root() {
        let dir = TempDir::new().unwrap();
        let project = FsProject::new("p", dir.path());
        project.write_file("a/b/c.md", "deep").unwrap();
        assert_eq!(project.read_file("a/b/c.md").unwrap().as_deref(), Some("deep"));
        assert!(project.read_file("nope.md").unwrap().is_none());
        assert!(project.write_file("../escape.md", "x").is_err());
    }

    #[test]
    fn soft_delete_moves_into_deleted() {
        let dir = TempDir::new().unwrap();
        let project = FsProject::new("p", dir.path());
        project.write_file("docs/qa/report.md", "r").unwrap();
        let dest = project.soft_delete("docs/qa/report.md").unwrap();
        assert!(dest.ends_with("_docs_qa_report.md"));
        assert!(!dir.path().join("docs/qa/report.md").exists());
        assert!(dir.path().join(".deleted").join(&dest).is_file());

        assert!(matches!(
            project.soft_delete("docs/../x.md"),
            Err(YabpError::InvalidPath(_))
        ));
        assert!(matches!(
            project.soft_delete("missing.md"),
            Err(YabpError::FileNotFound(_))
        ));
    }

    #[test]
    fn configure_cannot_overwrite_executable_files() {
        let agents = TempDir::new().unwrap();
        crate::testutil::write_agent(
            agents.path(),
            "devops-engineer",
            "name: DevOps Engineer\n",
            &[("prompts/001_cicd_pipeline.md", "pipeline")],
        );
        let store = crate::store::FsTemplateStore::new(agents.path());
        let rules = RuleSet::default();
        let policy = ExecutablePolicy::default();
        let sources = CatalogueSources {
            store: &store,
            rules: &rules,
            policy: &policy,
        };
        let dir = TempDir::new().unwrap();
        let project = FsProject::new("shop", dir.path());
        let selections = Selections::new().with("CI/CD Platform", "GitHub Actions");
        let config = ProjectConfig::new(vec!["devops-engineer".into()], Some(selections));
        let compiled = compiler::generate(&project, "shop", config, &sources).unwrap();
        assert_eq!(compiled.executable_files, vec!["Base CI/CD Pipeline.md"]);

        let patched = configure(
            &project,
            &obj(json!({"executableFiles": ["rm -rf.md"], "owner": "me"})),
            &sources,
        )
        .unwrap();
        assert_eq!(patched.executable_files, compiled.executable_files);
        let stored = project.read_config().unwrap();
        assert_eq!(stored.executable_files, vec!["Base CI/CD Pipeline.md"]);
        assert_eq!(stored.extra["owner"], "me");
    }

    #[test]
    fn registry_lookup_falls_back_to_default_path() {
        let home = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.default_project_path = PathBuf::from("/base");
        assert_eq!(
            locate(home.path(), &settings, "x").unwrap(),
            PathBuf::from("/base/x")
        );

        let mut reg = Registry::default();
        reg.insert("x", "/elsewhere/x");
        reg.save(home.path()).unwrap();
        assert_eq!(
            locate(home.path(), &settings, "x").unwrap(),
            PathBuf::from("/elsewhere/x")
        );
        assert!(matches!(
            open(home.path(), &settings, "x"),
            Err(YabpError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn delete_purges_only_under_default_path() {
        let home = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.default_project_path = base.path().to_path_buf();

        std::fs::create_dir_all(base.path().join("inside")).unwrap();
        let mut reg = Registry::default();
        reg.insert("inside", base.path().join("inside"));
        reg.insert("outside", outside.path());
        reg.save(home.path()).unwrap();

        assert!(delete(home.path(), &settings, "inside", true).unwrap());
        assert!(!base.path().join("inside").exists());
        assert!(delete(home.path(), &settings, "outside", true).unwrap());
        assert!(outside.path().exists());
        assert!(!delete(home.path(), &settings, "ghost", true).unwrap());
        assert!(list(home.path()).unwrap().is_empty());
    }
}
