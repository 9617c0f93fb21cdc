use crate::error::Result;
use crate::rules::RuleSet;
use crate::selection::Selections;
use crate::store::TemplateStore;
use serde::Serialize;

/// A fragment chosen for an agent, with its content loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFragment {
    pub title: String,
    pub content: String,
    pub relative_path: String,
}

impl ResolvedFragment {
    /// File name without directories or the `.md` extension.
    pub fn stem(&self) -> &str {
        file_stem(&self.relative_path)
    }
}

fn file_stem(relative_path: &str) -> &str {
    let name = relative_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(relative_path);
    name.strip_suffix(".md").unwrap_or(name)
}

/// Ordered fragments for `agent_id` under `selections`.
///
/// No selections means nothing is selected. Rules whose fragment is absent
/// from the store are skipped.
pub fn resolve_fragments(
    agent_id: &str,
    store: &dyn TemplateStore,
    selections: Option<&Selections>,
    rules: &RuleSet,
) -> Result<Vec<ResolvedFragment>> {
    let Some(selections) = selections else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for rule in rules.for_agent(agent_id) {
        if !rule.when.matches(selections) {
            continue;
        }
        let Some(content) = store.read_fragment(agent_id, &rule.fragment)? else {
            tracing::debug!(agent = agent_id, fragment = %rule.fragment, "fragment missing, skipped");
            continue;
        };
        let title = rule
            .title
            .clone()
            .unwrap_or_else(|| file_stem(&rule.fragment).to_string());
        out.push(ResolvedFragment {
            title,
            content,
            relative_path: rule.fragment.clone(),
        });
    }
    Ok(out)
}
