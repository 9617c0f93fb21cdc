use crate::backend::AgentCliBackend;
use crate::cmd::{read_input, Workspace};
use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use yabp_core::dispatch::{Dispatcher, ExecutionState, RunMode, RunRequest};

#[derive(Args)]
pub struct RunArgs {
    /// Project name
    pub project: String,

    /// Agent whose system instruction, docs folder and fragments apply
    #[arg(long)]
    pub agent: Option<String>,

    /// Prompt text
    #[arg(long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt from a file ('-' for stdin)
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Hand the prompt to the agent CLI instead of simulating
    #[arg(long)]
    pub live: bool,

    /// Output folder under docs/, overriding the agent's
    #[arg(long)]
    pub docs_folder: Option<String>,
}

pub fn run(ws: &Workspace, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) if path.as_os_str() == "-" => read_input(None)?,
        (None, Some(path)) => read_input(Some(path))?,
        (None, None) => anyhow::bail!("one of --prompt or --prompt-file is required"),
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("prompt is empty");
    }

    let project = ws.open_project(&args.project)?;
    let mode = if args.live {
        RunMode::Live
    } else {
        RunMode::Simulate
    };

    let backend = match mode {
        RunMode::Live => Some(AgentCliBackend::new().context("failed to start async runtime")?),
        RunMode::Simulate => None,
    };
    let mut dispatcher = Dispatcher::new(&ws.store, &ws.settings);
    if let Some(backend) = &backend {
        dispatcher = dispatcher.with_backend(backend);
    }

    let outcome = dispatcher
        .run(
            &project,
            &args.project,
            &RunRequest {
                prompt: &prompt,
                agent_id: args.agent.as_deref(),
                mode,
                docs_folder: args.docs_folder.as_deref(),
            },
        )
        .with_context(|| format!("run failed for project '{}'", args.project))?;

    if json {
        print_json(&outcome)?;
    } else {
        for file in outcome.prompt.input_files.iter().filter(|f| !f.found) {
            eprintln!("warning: input file not found: {}", file.path);
        }
        println!("{}", outcome.output);
    }

    if outcome.state == ExecutionState::Failed {
        anyhow::bail!("agent could not be started (log kept at {})", outcome.log_file);
    }
    Ok(())
}
