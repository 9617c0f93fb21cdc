use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use yabp_core::workflow;

#[derive(Subcommand)]
pub enum WorkflowSubcommand {
    /// List built-in workflow templates
    List,

    /// Show the phases of one template
    Show { id: String },
}

pub fn run(subcmd: WorkflowSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        WorkflowSubcommand::List => {
            let templates = workflow::templates();
            if json {
                return print_json(&templates);
            }
            let rows = templates
                .iter()
                .map(|t| vec![t.id.clone(), t.name.clone(), t.phases.len().to_string()])
                .collect();
            print_table(&["ID", "NAME", "PHASES"], rows);
            Ok(())
        }
        WorkflowSubcommand::Show { id } => {
            let template =
                workflow::find(&id).with_context(|| format!("unknown workflow template '{id}'"))?;
            if json {
                return print_json(&template);
            }
            println!("{} ({})\n{}\n", template.name, template.id, template.description);
            for phase in &template.phases {
                println!("{}: {}", phase.label, phase.description);
                println!("  agents: {}", phase.allowed_agents.join(", "));
            }
            println!("\nRecommended: {}", template.recommended_agents.join(", "));
            Ok(())
        }
    }
}
