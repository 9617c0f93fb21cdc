use crate::cmd::{parse_pair, Workspace};
use crate::output::{print_json, print_warnings};
use anyhow::Context;
use clap::Subcommand;
use yabp_core::config::{Settings, WarnLevel};

#[derive(Subcommand)]
pub enum SettingsSubcommand {
    /// Show global settings (credential masked) and any warnings
    Show,

    /// Set cursorKey, defaultProjectPath or agentCommand; an empty value clears it
    Set {
        #[arg(value_name = "KEY=VALUE")]
        pair: String,
    },
}

pub fn run(ws: &Workspace, subcmd: SettingsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SettingsSubcommand::Show => show(&ws.settings, json),
        SettingsSubcommand::Set { pair } => {
            let (key, value) = parse_pair(&pair)?;
            let mut settings = ws.settings.clone();
            settings.set(&key, &value)?;
            settings
                .save(&ws.dirs.home)
                .context("failed to save settings")?;
            if json {
                print_json(&settings.redacted())
            } else {
                println!("Updated {key}");
                Ok(())
            }
        }
    }
}

fn show(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let warnings = settings.validate();
    if json {
        return print_json(&serde_json::json!({
            "settings": settings.redacted(),
            "warnings": warnings,
        }));
    }

    let shown = settings.redacted();
    println!(
        "cursorKey:          {}",
        shown.cursor_key.as_deref().unwrap_or("(not set)")
    );
    println!(
        "defaultProjectPath: {}",
        shown.default_project_path.display()
    );
    println!(
        "agentCommand:       {}",
        shown.agent_command.as_deref().unwrap_or("(auto)")
    );
    print_warnings(&warnings);

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("settings validation found errors");
    }
    Ok(())
}
