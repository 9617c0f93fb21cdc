use crate::cmd::{read_input, Workspace};
use crate::output::print_json;
use clap::Subcommand;
use std::path::PathBuf;
use yabp_core::project::ProjectStore;
use yabp_core::YabpError;

#[derive(Subcommand)]
pub enum FileSubcommand {
    /// Print a file from the project
    Read { project: String, path: String },

    /// Write a file into the project (content from --from or stdin)
    Write {
        project: String,
        path: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Move a file into the project's .deleted/ folder
    Delete { project: String, path: String },
}

pub fn run(ws: &Workspace, subcmd: FileSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        FileSubcommand::Read { project, path } => {
            let content = ws
                .open_project(&project)?
                .read_file(&path)?
                .ok_or_else(|| YabpError::FileNotFound(path.clone()))?;
            if json {
                print_json(&serde_json::json!({ "path": path, "content": content }))
            } else {
                print!("{content}");
                Ok(())
            }
        }
        FileSubcommand::Write {
            project,
            path,
            from,
        } => {
            let content = read_input(from.as_deref())?;
            ws.open_project(&project)?.write_file(&path, &content)?;
            println!("Wrote {path}");
            Ok(())
        }
        FileSubcommand::Delete { project, path } => {
            let moved_to = ws.open_project(&project)?.soft_delete(&path)?;
            if json {
                print_json(&serde_json::json!({ "path": path, "deletedAs": moved_to }))
            } else {
                println!("Moved {path} to .deleted/{moved_to}");
                Ok(())
            }
        }
    }
}
