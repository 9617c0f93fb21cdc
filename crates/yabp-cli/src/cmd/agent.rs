use crate::cmd::{parse_pair, read_input, Workspace};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::PathBuf;
use yabp_core::store::{AgentBundle, TemplateStore};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum AgentSubcommand {
    /// List all agents
    List,

    /// Show an agent's metadata and prompt files
    Show { id: String },

    /// Create an empty agent
    Create {
        /// Display name; the id is derived from it
        name: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },

    /// Update metadata keys (values are parsed as YAML)
    Update {
        id: String,
        /// key=value, repeatable
        #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Write a prompt file and register it (content from --from or stdin)
    PromptSave {
        id: String,
        /// File name under prompts/, e.g. spec_001_overview.md
        file: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Remove a prompt file and its registration
    PromptDelete { id: String, file: String },

    /// Write an agent and all its fragments to a YAML bundle ('-' for stdout)
    Export { id: String, out: PathBuf },

    /// Install an agent from a YAML bundle
    Import {
        bundle: PathBuf,
        /// Replace an existing agent with the same id
        #[arg(long)]
        overwrite: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ws: &Workspace, subcmd: AgentSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AgentSubcommand::List => list(ws, json),
        AgentSubcommand::Show { id } => show(ws, &id, json),
        AgentSubcommand::Create {
            name,
            role,
            category,
            icon,
        } => create(ws, &name, role, category, icon, json),
        AgentSubcommand::Update { id, set } => update(ws, &id, &set, json),
        AgentSubcommand::PromptSave { id, file, from } => {
            let content = read_input(from.as_deref())?;
            ws.store
                .save_prompt(&id, &file, &content)
                .with_context(|| format!("failed to save {id}/{file}"))?;
            println!("Saved prompt {id}/{file}");
            Ok(())
        }
        AgentSubcommand::PromptDelete { id, file } => {
            ws.store
                .delete_prompt(&id, &file)
                .with_context(|| format!("failed to delete {id}/{file}"))?;
            println!("Deleted prompt {id}/{file}");
            Ok(())
        }
        AgentSubcommand::Export { id, out } => export(ws, &id, &out),
        AgentSubcommand::Import { bundle, overwrite } => import(ws, &bundle, overwrite, json),
    }
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

fn list(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let agents = ws.store.list_agents().context("failed to list agents")?;
    if json {
        return print_json(&agents);
    }
    if agents.is_empty() {
        println!("No agents in {}.", ws.dirs.agents.display());
        return Ok(());
    }
    let rows = agents
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                format!("{} {}", a.icon, a.name),
                a.category.clone(),
                a.prompts.len().to_string(),
                if a.active { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "CATEGORY", "PROMPTS", "ACTIVE"], rows);
    Ok(())
}

fn show(ws: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let agent = ws.store.require_agent(id)?;
    let files = ws.store.list_prompt_files(id)?;
    let fragments = ws.store.list_fragments(id)?;

    if json {
        return print_json(&serde_json::json!({
            "agent": agent,
            "promptFiles": files,
            "fragments": fragments,
        }));
    }

    println!("{} {} ({})", agent.icon, agent.name, agent.id);
    if !agent.role.is_empty() {
        println!("Role:        {}", agent.role);
    }
    println!("Category:    {}", agent.category);
    if let Some(folder) = &agent.docs_folder {
        println!("Docs folder: {folder}");
    }
    if !agent.description.is_empty() {
        println!("\n{}", agent.description);
    }
    println!("\nPrompts:");
    for p in &agent.prompts {
        let mark = if p.executable { "*" } else { " " };
        println!("  {mark} {:<32} {}", p.id, p.title);
    }
    println!("\nFragments: {}", fragments.len());
    for f in &fragments {
        println!("  {f}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// create / update
// ---------------------------------------------------------------------------

fn create(
    ws: &Workspace,
    name: &str,
    role: Option<String>,
    category: Option<String>,
    icon: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let agent = ws
        .store
        .create_agent(name, role, category, icon)
        .with_context(|| format!("failed to create agent '{name}'"))?;
    if json {
        print_json(&agent)
    } else {
        println!("Created agent: {}", agent.id);
        Ok(())
    }
}

fn update(ws: &Workspace, id: &str, set: &[String], json: bool) -> anyhow::Result<()> {
    let mut patch = serde_yaml::Mapping::new();
    for raw in set {
        let (key, value) = parse_pair(raw)?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&value).unwrap_or(serde_yaml::Value::String(value));
        patch.insert(serde_yaml::Value::String(key), value);
    }
    let agent = ws
        .store
        .update_metadata(id, &patch)
        .with_context(|| format!("failed to update agent '{id}'"))?;
    if json {
        print_json(&agent)
    } else {
        println!("Updated agent: {}", agent.id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// export / import
// ---------------------------------------------------------------------------

fn export(ws: &Workspace, id: &str, out: &std::path::Path) -> anyhow::Result<()> {
    let bundle = ws.store.export_bundle(id)?;
    let yaml = serde_yaml::to_string(&bundle)?;
    if out.as_os_str() == "-" {
        print!("{yaml}");
        return Ok(());
    }
    std::fs::write(out, yaml).with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "Exported {id} ({} files) to {}",
        bundle.files.len(),
        out.display()
    );
    Ok(())
}

fn import(ws: &Workspace, path: &std::path::Path, overwrite: bool, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let bundle: AgentBundle =
        serde_yaml::from_str(&data).with_context(|| format!("invalid bundle {}", path.display()))?;
    let agent = ws.store.import_bundle(&bundle, overwrite)?;
    if json {
        print_json(&agent)
    } else {
        println!("Imported agent: {}", agent.id);
        Ok(())
    }
}
