//! Artifact compiler: turns a project's agents and selections into the
//! combined prompt catalogue, the executable-file set and the README.

use crate::error::Result;
use crate::interpolate::interpolate;
use crate::paths;
use crate::project::{CatalogueSources, ProjectConfig, ProjectStore};
use crate::resolver::resolve_fragments;
use crate::rules::RuleSet;
use crate::selection::Selections;
use crate::store::TemplateStore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// ExecutablePolicy
// ---------------------------------------------------------------------------

/// Decides which compiled fragments become runnable from the file browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutablePolicy {
    /// A fragment stored below a subdirectory of its agent
    /// (`framework/x.md`, `prompts/y.md`) is executable without being listed.
    #[serde(default = "default_nested_paths")]
    pub nested_paths: bool,
}

fn default_nested_paths() -> bool {
    true
}

impl Default for ExecutablePolicy {
    fn default() -> Self {
        Self {
            nested_paths: default_nested_paths(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compilation {
    pub document: String,
    /// `"<title>.md"` for every executable fragment, first occurrence order.
    pub executable_files: Vec<String>,
    pub readme: String,
}

pub fn compile(
    project_name: &str,
    agents: &[String],
    selections: Option<&Selections>,
    store: &dyn TemplateStore,
    rules: &RuleSet,
    policy: &ExecutablePolicy,
) -> Result<Compilation> {
    let mut document = format!("# Project Prompts for {project_name}\n\nGenerated by YABP\n\n");
    let mut executable_files: Vec<String> = Vec::new();

    for agent_id in agents {
        let Some(agent) = store.load_agent(agent_id)? else {
            tracing::debug!(agent = %agent_id, "no metadata, agent skipped");
            continue;
        };
        document.push_str(&format!("## Agent: {}\n\n", agent.name));

        for fragment in resolve_fragments(agent_id, store, selections, rules)? {
            document.push_str(&format!(
                "### {}\n\n```\n{}\n```\n\n",
                fragment.title, fragment.content
            ));

            let nested = policy.nested_paths && fragment.relative_path.contains('/');
            if nested || agent.flags_executable(fragment.stem(), &fragment.title) {
                let file = format!("{}.md", fragment.title);
                if !executable_files.contains(&file) {
                    executable_files.push(file);
                }
            }
        }
    }

    Ok(Compilation {
        document,
        executable_files,
        readme: readme(project_name, agents),
    })
}

fn readme(project_name: &str, agents: &[String]) -> String {
    let list = agents
        .iter()
        .map(|a| format!("- {a}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "# {project_name}\n\n\
         This project was generated using YABP with the following agents:\n\
         {list}\n\n\
         Check the `.yabp/prompts.md` for the prompts to use with Cursor CLI."
    )
}

/// Compile `config` and persist the result into `project`: the catalogue,
/// the config carrying the fresh `executableFiles`, and the README.
pub fn generate(
    project: &dyn ProjectStore,
    project_name: &str,
    mut config: ProjectConfig,
    sources: &CatalogueSources<'_>,
) -> Result<ProjectConfig> {
    let compilation = compile(
        project_name,
        &config.agents,
        config.selections.as_ref(),
        sources.store,
        sources.rules,
        sources.policy,
    )?;
    config.executable_files = compilation.executable_files;
    project.write_config(&config)?;
    project.write_file(paths::PROMPTS_FILE, &compilation.document)?;
    project.write_file(paths::README_FILE, &compilation.readme)?;
    tracing::info!(
        project = project_name,
        agents = config.agents.len(),
        executable = config.executable_files.len(),
        "compiled prompt catalogue"
    );
    Ok(config)
}

// ---------------------------------------------------------------------------
// Catalogue parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueEntry {
    pub title: String,
    pub body: String,
}

static SECTION_RE: OnceLock<Regex> = OnceLock::new();
static FENCE_RE: OnceLock<Regex> = OnceLock::new();
static AGENT_TAIL_RE: OnceLock<Regex> = OnceLock::new();

fn section_re() -> &'static Regex {
    SECTION_RE.get_or_init(|| Regex::new(r"(?m)^###[ \t]+").unwrap())
}

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(r"^```\n?|```$").unwrap())
}

// The next agent's heading trails the last fragment of the previous agent.
fn agent_tail_re() -> &'static Regex {
    AGENT_TAIL_RE.get_or_init(|| Regex::new(r"\n## Agent: [^\n]*\s*$").unwrap())
}

/// Split a compiled catalogue back into its fragments. Text before the
/// first `### ` heading is dropped.
pub fn parse_catalogue(document: &str) -> Vec<CatalogueEntry> {
    section_re()
        .split(document)
        .skip(1)
        .map(|section| {
            let (title, rest) = section.split_once('\n').unwrap_or((section, ""));
            let title = title.trim();
            let title = title.strip_suffix(".md").unwrap_or(title).to_string();
            let rest = agent_tail_re().replace(rest, "");
            let body = fence_re().replace_all(rest.trim(), "").into_owned();
            CatalogueEntry { title, body }
        })
        .collect()
}

/// The project's catalogue with each body interpolated against
/// `{...config, name}`. Empty when nothing has been compiled yet.
pub fn project_prompts(project: &dyn ProjectStore, project_name: &str) -> Result<Vec<CatalogueEntry>> {
    let Some(document) = project.read_file(paths::PROMPTS_FILE)? else {
        return Ok(Vec::new());
    };
    let vars = project.read_config()?.variables(project_name)?;
    Ok(parse_catalogue(&document)
        .into_iter()
        .map(|entry| CatalogueEntry {
            body: interpolate(&entry.body, &vars),
            title: entry.title,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FsProject;
    use crate::rules::{Condition, SelectionRule};
    use crate::store::FsTemplateStore;
    use crate::testutil::write_agent;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, FsTemplateStore) {
        let dir = TempDir::new().unwrap();
        write_agent(
            dir.path(),
            "devops-engineer",
            "name: DevOps Engineer\n",
            &[
                ("prompts/001_cicd_pipeline.md", "pipeline for {{name}}"),
                ("infrastructure/aws_terraform_complete.md", "tf"),
                ("infrastructure/aws_cdk_typescript.md", "cdk"),
            ],
        );
        write_agent(
            dir.path(),
            "notes-agent",
            "name: Notes\nprompts:\n  - id: top\n    title: Top Level\n    executable: true\n",
            &[("top.md", "flat"), ("other.md", "flat too")],
        );
        let store = FsTemplateStore::new(dir.path());
        (dir, store)
    }

    fn aws_tf() -> Selections {
        Selections::new()
            .with("Cloud Provider", "AWS")
            .with("Infrastructure", vec!["Terraform"])
            .with("CI/CD Platform", "GitHub Actions")
    }

    #[test]
    fn document_layout() {
        let (_dir, store) = fixture();
        let agents = vec!["devops-engineer".to_string(), "ghost".to_string()];
        let c = compile(
            "shop",
            &agents,
            Some(&aws_tf()),
            &store,
            &RuleSet::default(),
            &ExecutablePolicy::default(),
        )
        .unwrap();
        assert!(c.document.starts_with("# Project Prompts for shop\n\nGenerated by YABP\n\n"));
        assert!(c.document.contains("## Agent: DevOps Engineer\n\n"));
        assert!(c
            .document
            .contains("### AWS Infrastructure (Terraform)\n\n```\ntf\n```\n\n"));
        assert!(!c.document.contains("ghost"));
        assert_eq!(
            c.executable_files,
            vec![
                "Base CI/CD Pipeline.md",
                "AWS Infrastructure (Terraform).md",
                "AWS Infrastructure (CDK).md"
            ]
        );
        assert!(c.readme.contains("- devops-engineer\n- ghost"));
        assert!(c.readme.ends_with("for the prompts to use with Cursor CLI."));
    }

    #[test]
    fn flat_fragments_need_listing() {
        let (_dir, store) = fixture();
        let rules = RuleSet::new(vec![
            SelectionRule {
                agent: "notes-agent".into(),
                when: Condition::Always,
                fragment: "top.md".into(),
                title: None,
            },
            SelectionRule {
                agent: "notes-agent".into(),
                when: Condition::Always,
                fragment: "other.md".into(),
                title: None,
            },
        ]);
        let c = compile(
            "p",
            &["notes-agent".to_string()],
            Some(&Selections::new()),
            &store,
            &rules,
            &ExecutablePolicy::default(),
        )
        .unwrap();
        assert_eq!(c.executable_files, vec!["top.md"]);
    }

    #[test]
    fn policy_can_disable_nested_inference() {
        let (_dir, store) = fixture();
        let policy = ExecutablePolicy { nested_paths: false };
        let c = compile(
            "p",
            &["devops-engineer".to_string()],
            Some(&aws_tf()),
            &store,
            &RuleSet::default(),
            &policy,
        )
        .unwrap();
        assert!(c.executable_files.is_empty());
    }

    #[test]
    fn generate_writes_consistent_artifacts() {
        let (_dir, store) = fixture();
        let proj_dir = TempDir::new().unwrap();
        let project = FsProject::new("shop", proj_dir.path());
        let rules = RuleSet::default();
        let policy = ExecutablePolicy::default();
        let sources = CatalogueSources {
            store: &store,
            rules: &rules,
            policy: &policy,
        };
        let config = ProjectConfig::new(vec!["devops-engineer".into()], Some(aws_tf()));
        let written = generate(&project, "shop", config, &sources).unwrap();

        let stored = project.read_config().unwrap();
        assert_eq!(stored, written);
        let document = project.read_file(paths::PROMPTS_FILE).unwrap().unwrap();
        let titles: Vec<String> = parse_catalogue(&document)
            .into_iter()
            .map(|e| format!("{}.md", e.title))
            .collect();
        // Every executable file corresponds to a compiled fragment.
        for file in &stored.executable_files {
            assert!(titles.contains(file), "{file} not in catalogue");
        }
        assert!(project.read_file(paths::README_FILE).unwrap().is_some());
    }

    #[test]
    fn parse_catalogue_strips_fences_and_suffix() {
        let doc = "# Project Prompts for p\n\nGenerated by YABP\n\n## Agent: A\n\n\
                   ### Setup.md\n\n```\nline one\nline two\n```\n\n\
                   ## Agent: B\n\n\
                   ### Second\n\n```\nbody\n```\n\n";
        let entries = parse_catalogue(doc);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Setup");
        assert_eq!(entries[0].body, "line one\nline two\n");
        assert_eq!(entries[1].body, "body\n");
    }

    #[test]
    fn project_prompts_interpolate_name() {
        let (_dir, store) = fixture();
        let proj_dir = TempDir::new().unwrap();
        let project = FsProject::new("shop", proj_dir.path());
        assert!(project_prompts(&project, "shop").unwrap().is_empty());

        let rules = RuleSet::default();
        let policy = ExecutablePolicy::default();
        let sources = CatalogueSources {
            store: &store,
            rules: &rules,
            policy: &policy,
        };
        let config = ProjectConfig::new(vec!["devops-engineer".into()], Some(aws_tf()));
        generate(&project, "shop", config, &sources).unwrap();

        let prompts = project_prompts(&project, "shop").unwrap();
        assert_eq!(prompts[0].title, "Base CI/CD Pipeline");
        assert_eq!(prompts[0].body, "pipeline for shop\n");
    }
}
