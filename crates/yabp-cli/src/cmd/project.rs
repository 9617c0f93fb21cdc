use crate::cmd::{json_value, parse_pair, parse_selections, Workspace};
use crate::output::{print_json, print_table, print_tree};
use anyhow::Context;
use clap::Subcommand;
use serde_json::Map;
use std::path::PathBuf;
use yabp_core::compiler;
use yabp_core::project::{self as core_project, ProjectConfig, ProjectStore};
use yabp_core::workflow;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// List registered projects
    List,

    /// Create a project and compile its prompt catalogue
    Create {
        name: String,
        /// Agent ids, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        agents: Vec<String>,
        /// Section=Value; repeat a section for a multi-select
        #[arg(long = "select", value_name = "SECTION=VALUE")]
        select: Vec<String>,
        /// Parent directory (default: defaultProjectPath)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Built-in workflow template to attach
        #[arg(long)]
        workflow: Option<String>,
    },

    /// Show a project's configuration
    Show { name: String },

    /// Change agents, selections or other config keys
    Configure {
        name: String,
        #[arg(long, value_delimiter = ',')]
        agents: Option<Vec<String>>,
        /// Replaces all selections when given
        #[arg(long = "select", value_name = "SECTION=VALUE")]
        select: Vec<String>,
        /// Any other top-level config key (values parsed as JSON)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// List the compiled prompts with project variables filled in
    Prompts { name: String },

    /// Show the project file tree (* marks executable prompts)
    Files { name: String },

    /// Remove a project from the registry
    Delete {
        name: String,
        /// Also remove the directory (only under defaultProjectPath)
        #[arg(long)]
        purge: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ws: &Workspace, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::List => list(ws, json),
        ProjectSubcommand::Create {
            name,
            agents,
            select,
            path,
            workflow,
        } => create(ws, &name, agents, &select, path, workflow.as_deref(), json),
        ProjectSubcommand::Show { name } => show(ws, &name, json),
        ProjectSubcommand::Configure {
            name,
            agents,
            select,
            set,
        } => configure(ws, &name, agents, &select, &set, json),
        ProjectSubcommand::Prompts { name } => prompts(ws, &name, json),
        ProjectSubcommand::Files { name } => files(ws, &name, json),
        ProjectSubcommand::Delete { name, purge } => {
            let removed = core_project::delete(&ws.dirs.home, &ws.settings, &name, purge)
                .with_context(|| format!("failed to delete project '{name}'"))?;
            if json {
                print_json(&serde_json::json!({ "name": name, "removed": removed }))
            } else if removed {
                println!("Deleted project: {name}");
                Ok(())
            } else {
                anyhow::bail!("project '{name}' is not registered")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

fn list(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let projects = core_project::list(&ws.dirs.home).context("failed to list projects")?;
    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    let rows = projects
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.config.agents.join(","),
                p.path.display().to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "AGENTS", "PATH"], rows);
    Ok(())
}

fn show(ws: &Workspace, name: &str, json: bool) -> anyhow::Result<()> {
    let project = ws.open_project(name)?;
    let config = project.read_config()?;
    if json {
        return print_json(&serde_json::json!({
            "name": name,
            "path": project.root(),
            "config": config,
        }));
    }
    println!("Project: {name}");
    println!("Path:    {}", project.root().display());
    println!("Agents:  {}", config.agents.join(", "));
    if let Some(selections) = &config.selections {
        println!("Selections:");
        for (section, value) in selections.iter() {
            println!("  {section}: {}", serde_json::to_string(value)?);
        }
    }
    if !config.executable_files.is_empty() {
        println!("Executable: {}", config.executable_files.join(", "));
    }
    if let Some(phases) = &config.workflow {
        let labels: Vec<&str> = phases.iter().map(|p| p.label.as_str()).collect();
        println!("Workflow: {}", labels.join(" → "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// create / configure
// ---------------------------------------------------------------------------

fn create(
    ws: &Workspace,
    name: &str,
    agents: Vec<String>,
    select: &[String],
    path: Option<PathBuf>,
    workflow_id: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let selections = if select.is_empty() {
        None
    } else {
        Some(parse_selections(select)?)
    };
    let mut config = ProjectConfig::new(agents, selections);
    config.project_path = path;
    if let Some(id) = workflow_id {
        let template =
            workflow::find(id).with_context(|| format!("unknown workflow template '{id}'"))?;
        config.workflow = Some(template.phases);
    }

    let (project, config) =
        core_project::create(&ws.dirs.home, &ws.settings, name, config, &ws.sources())
            .with_context(|| format!("failed to create project '{name}'"))?;

    if json {
        return print_json(&serde_json::json!({
            "name": name,
            "path": project.root(),
            "config": config,
        }));
    }
    println!("Created project: {name}");
    println!("Path: {}", project.root().display());
    if !config.executable_files.is_empty() {
        println!("Executable prompts: {}", config.executable_files.join(", "));
    }
    Ok(())
}

fn configure(
    ws: &Workspace,
    name: &str,
    agents: Option<Vec<String>>,
    select: &[String],
    set: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let mut patch = Map::new();
    for raw in set {
        let (key, value) = parse_pair(raw)?;
        patch.insert(key, json_value(&value));
    }
    if let Some(agents) = agents {
        patch.insert("agents".into(), serde_json::to_value(agents)?);
    }
    if !select.is_empty() {
        patch.insert(
            "selections".into(),
            serde_json::to_value(parse_selections(select)?)?,
        );
    }
    if patch.is_empty() {
        anyhow::bail!("nothing to change: pass --agents, --select or --set");
    }

    let project = ws.open_project(name)?;
    let recompiled = ProjectConfig::patch_affects_catalogue(&patch);
    let config = core_project::configure(&project, &patch, &ws.sources())
        .with_context(|| format!("failed to configure project '{name}'"))?;

    if json {
        print_json(&serde_json::json!({
            "config": config,
            "recompiled": recompiled,
        }))
    } else {
        println!(
            "Updated project: {name}{}",
            if recompiled { " (prompts regenerated)" } else { "" }
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// prompts / files
// ---------------------------------------------------------------------------

fn prompts(ws: &Workspace, name: &str, json: bool) -> anyhow::Result<()> {
    let project = ws.open_project(name)?;
    let entries = compiler::project_prompts(&project, name)?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No prompts compiled for {name}.");
        return Ok(());
    }
    for entry in &entries {
        println!("### {}\n\n{}\n", entry.title, entry.body);
    }
    Ok(())
}

fn files(ws: &Workspace, name: &str, json: bool) -> anyhow::Result<()> {
    let project = ws.open_project(name)?;
    let tree = project.file_tree()?;
    if json {
        return print_json(&tree);
    }
    print_tree(&tree);
    Ok(())
}
