use crate::cmd::{json_value, parse_pair, Workspace};
use crate::output::print_json;
use clap::Subcommand;
use serde_json::Map;
use yabp_core::project::ProjectStore;

#[derive(Subcommand)]
pub enum ContextSubcommand {
    /// Print the project's context store
    Get { name: String },

    /// Merge key=value pairs into the context (values parsed as JSON)
    Set {
        name: String,
        #[arg(value_name = "KEY=VALUE", required = true)]
        pairs: Vec<String>,
    },
}

pub fn run(ws: &Workspace, subcmd: ContextSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ContextSubcommand::Get { name } => {
            let context = ws.open_project(&name)?.read_context()?;
            if json {
                return print_json(&context);
            }
            if context.is_empty() {
                println!("Context for {name} is empty.");
            }
            for (k, v) in &context {
                println!("{k} = {v}");
            }
            Ok(())
        }
        ContextSubcommand::Set { name, pairs } => {
            let mut patch = Map::new();
            for raw in &pairs {
                let (k, v) = parse_pair(raw)?;
                patch.insert(k, json_value(&v));
            }
            let context = ws.open_project(&name)?.patch_context(&patch)?;
            if json {
                print_json(&context)
            } else {
                println!("Updated context for {name} ({} keys)", context.len());
                Ok(())
            }
        }
    }
}
