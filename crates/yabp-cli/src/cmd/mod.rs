pub mod agent;
pub mod context;
pub mod file;
pub mod project;
pub mod run;
pub mod settings;
pub mod workflow;

use anyhow::Context;
use std::io::Read;
use std::path::Path;
use yabp_core::compiler::ExecutablePolicy;
use yabp_core::config::Settings;
use yabp_core::project::{self as core_project, CatalogueSources, FsProject};
use yabp_core::rules::RuleSet;
use yabp_core::selection::{SelectionValue, Selections};
use yabp_core::store::FsTemplateStore;

use crate::root::Dirs;

// ---------------------------------------------------------------------------
// Shared per-invocation state
// ---------------------------------------------------------------------------

/// Everything a command needs from disk, loaded once.
pub struct Workspace {
    pub dirs: Dirs,
    pub settings: Settings,
    pub store: FsTemplateStore,
    pub rules: RuleSet,
    pub policy: ExecutablePolicy,
}

impl Workspace {
    pub fn load(dirs: Dirs) -> anyhow::Result<Self> {
        let settings = Settings::load(&dirs.home).context("failed to load settings")?;
        let rules = RuleSet::load(&dirs.agents).context("failed to load selection rules")?;
        let store = FsTemplateStore::new(&dirs.agents);
        Ok(Self {
            dirs,
            settings,
            store,
            rules,
            policy: ExecutablePolicy::default(),
        })
    }

    pub fn sources(&self) -> CatalogueSources<'_> {
        CatalogueSources {
            store: &self.store,
            rules: &self.rules,
            policy: &self.policy,
        }
    }

    pub fn open_project(&self, name: &str) -> anyhow::Result<FsProject> {
        core_project::open(&self.dirs.home, &self.settings, name)
            .with_context(|| format!("cannot open project '{name}'"))
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Split `key=value`. The value may itself contain `=`.
pub fn parse_pair(raw: &str) -> anyhow::Result<(String, String)> {
    let (k, v) = raw
        .split_once('=')
        .with_context(|| format!("expected key=value, got '{raw}'"))?;
    let k = k.trim();
    if k.is_empty() {
        anyhow::bail!("empty key in '{raw}'");
    }
    Ok((k.to_string(), v.to_string()))
}

/// `Section=Value` pairs into a selections map. A section given more than
/// once becomes a multi-select.
pub fn parse_selections(raw: &[String]) -> anyhow::Result<Selections> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for item in raw {
        let (section, value) = parse_pair(item)?;
        match grouped.iter_mut().find(|(s, _)| *s == section) {
            Some((_, values)) => values.push(value),
            None => grouped.push((section, vec![value])),
        }
    }
    let mut selections = Selections::new();
    for (section, mut values) in grouped {
        let value = if values.len() == 1 {
            SelectionValue::One(values.remove(0))
        } else {
            SelectionValue::Many(values)
        };
        selections.insert(section, value);
    }
    Ok(selections)
}

/// A command-line value as JSON: valid JSON literals keep their type,
/// anything else is a string.
pub fn json_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// Contents of `path`, or stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}
