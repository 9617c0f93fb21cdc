mod backend;
mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    agent::AgentSubcommand, context::ContextSubcommand, file::FileSubcommand,
    project::ProjectSubcommand, run::RunArgs, settings::SettingsSubcommand,
    workflow::WorkflowSubcommand, Workspace,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yabp",
    about = "Compose agent prompt templates into project scaffolding, then simulate or run them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data directory holding config/ (default: ~/.yabp)
    #[arg(long, global = true, env = "YABP_HOME")]
    home: Option<PathBuf>,

    /// Agent template directory (default: <home>/agents)
    #[arg(long, global = true, env = "YABP_AGENTS_DIR")]
    agents: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage agent templates
    Agent {
        #[command(subcommand)]
        subcommand: AgentSubcommand,
    },

    /// Create, configure and inspect projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Read and update a project's context store
    Context {
        #[command(subcommand)]
        subcommand: ContextSubcommand,
    },

    /// Assemble a prompt for a project and simulate or execute it
    Run(RunArgs),

    /// Built-in workflow templates
    Workflow {
        #[command(subcommand)]
        subcommand: WorkflowSubcommand,
    },

    /// Global settings
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommand,
    },

    /// Read, write and soft-delete project files
    File {
        #[command(subcommand)]
        subcommand: FileSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(args) if args.live => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let dirs = root::resolve_dirs(cli.home.as_deref(), cli.agents.as_deref());
    let json = cli.json;

    let result = Workspace::load(dirs).and_then(|ws| match cli.command {
        Commands::Agent { subcommand } => cmd::agent::run(&ws, subcommand, json),
        Commands::Project { subcommand } => cmd::project::run(&ws, subcommand, json),
        Commands::Context { subcommand } => cmd::context::run(&ws, subcommand, json),
        Commands::Run(args) => cmd::run::run(&ws, args, json),
        Commands::Workflow { subcommand } => cmd::workflow::run(subcommand, json),
        Commands::Settings { subcommand } => cmd::settings::run(&ws, subcommand, json),
        Commands::File { subcommand } => cmd::file::run(&ws, subcommand, json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
