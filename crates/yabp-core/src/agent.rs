use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// PromptRef
// ---------------------------------------------------------------------------

/// Entry in an agent's prompt list (`metadata.yaml` → `prompts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub executable: bool,
}

impl PromptRef {
    /// A new executable entry titled from its id: `spec_002_user_stories`
    /// becomes `Spec 002 User Stories`.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let title = title_from_id(&id);
        Self {
            id,
            title,
            executable: true,
        }
    }
}

fn title_from_id(id: &str) -> String {
    id.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Directory name under the agents root; always overwritten on load.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub prompts: Vec<PromptRef>,
    /// Artifact output subdirectory under `docs/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_folder: Option<String>,
    /// Free text prepended to every prompt run under this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    /// Keys this crate does not model; kept so metadata edits are lossless.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_category() -> String {
    "General".to_string()
}

fn default_icon() -> String {
    "🤖".to_string()
}

fn default_active() -> bool {
    true
}

impl Agent {
    /// An empty agent shell, as produced by explicit creation.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let id = paths::agent_id_from_name(&name)?;
        Ok(Self {
            id,
            name,
            role: String::new(),
            category: default_category(),
            icon: default_icon(),
            description: String::new(),
            active: true,
            prompts: Vec::new(),
            docs_folder: None,
            system_instruction: None,
            extra: BTreeMap::new(),
        })
    }

    pub fn from_yaml(id: &str, data: &str) -> Result<Self> {
        let mut agent: Agent = serde_yaml::from_str(data)?;
        agent.id = id.to_string();
        Ok(agent)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Top-level merge of `patch` into this agent's metadata. The id never
    /// changes.
    pub fn merge(&self, patch: &serde_yaml::Mapping) -> Result<Self> {
        let mut current = serde_yaml::to_value(self)?;
        if let serde_yaml::Value::Mapping(map) = &mut current {
            for (k, v) in patch {
                map.insert(k.clone(), v.clone());
            }
        }
        let mut merged: Agent = serde_yaml::from_value(current)?;
        merged.id = self.id.clone();
        Ok(merged)
    }

    pub fn prompt(&self, id: &str) -> Option<&PromptRef> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// True when the prompt list flags a fragment executable, matched by
    /// file stem or by resolved title.
    pub fn flags_executable(&self, stem: &str, title: &str) -> bool {
        self.prompts
            .iter()
            .find(|p| p.id == stem || p.title == title)
            .is_some_and(|p| p.executable)
    }

    /// Register a prompt file in the list if it is not there yet. Returns
    /// true if the list changed.
    pub fn register_prompt(&mut self, id: &str) -> bool {
        if self.prompt(id).is_some() {
            return false;
        }
        self.prompts.push(PromptRef::from_id(id));
        true
    }

    /// Returns true if an entry was removed.
    pub fn unregister_prompt(&mut self, id: &str) -> bool {
        let before = self.prompts.len();
        self.prompts.retain(|p| p.id != id);
        self.prompts.len() != before
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
