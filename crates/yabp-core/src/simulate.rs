//! Simulation: derive mock artifact writes from fragment frontmatter instead
//! of calling a live backend.

use crate::agent::Agent;
use crate::error::Result;
use crate::frontmatter;
use crate::paths;
use crate::project::ProjectStore;
use crate::store::TemplateStore;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulatedWrite {
    /// Project-relative output path.
    pub path: String,
    /// Fragment the artifact came from; `None` for a custom prompt.
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationFailure {
    pub path: String,
    pub source: Option<String>,
    pub error: String,
}

/// Per-artifact outcome. Writes that succeeded stay on disk even when
/// others fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub written: Vec<SimulatedWrite>,
    pub failures: Vec<SimulationFailure>,
}

impl SimulationReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.failures.is_empty()
    }

    /// One `[MOCK] ...` line per artifact.
    pub fn lines(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .written
            .iter()
            .map(|w| match &w.source {
                Some(src) => format!("[MOCK] Created artifact: {} (from {src})", w.path),
                None => format!("[MOCK] Created artifact: {}", w.path),
            })
            .collect();
        out.extend(
            self.failures
                .iter()
                .map(|f| format!("[MOCK] Failed to create {}: {}", f.path, f.error)),
        );
        out
    }
}

pub struct SimulationInput<'a> {
    /// Agent named by the run; its fragments are scanned even when it has
    /// no metadata.
    pub agent_id: Option<&'a str>,
    pub agent: Option<&'a Agent>,
    pub store: &'a dyn TemplateStore,
    /// The user's prompt as typed; quoted in the simulation banner.
    pub raw_prompt: &'a str,
    pub interpolated_prompt: &'a str,
    pub docs_folder_override: Option<&'a str>,
    pub project: &'a dyn ProjectStore,
}

// ---------------------------------------------------------------------------
// Content derivation
// ---------------------------------------------------------------------------

static EXAMPLE_RE: OnceLock<Regex> = OnceLock::new();

fn example_re() -> &'static Regex {
    EXAMPLE_RE.get_or_init(|| Regex::new(r"(?is)## Complete Code Example\s*\n(.*)").unwrap())
}

/// Trailing content of the `## Complete Code Example` section, trimmed.
pub fn example_section(text: &str) -> Option<String> {
    example_re()
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

pub fn banner(user_input: &str) -> String {
    format!(
        "> **[SIMULATION MODE]**\n> **User Input**: \"{user_input}\"\n> \n> *Note: This is a \
         structural example. Connect an LLM to generate real content based on your input.*\n\n---\n\n"
    )
}

/// Put the banner right after a leading `# ` title, or in front otherwise.
pub fn inject_banner(content: &str, user_input: &str) -> String {
    let banner = banner(user_input);
    if !content.starts_with("# ") {
        return format!("{banner}{content}");
    }
    match content.find('\n') {
        Some(end) => format!(
            "{}\n\n{banner}{}",
            &content[..end],
            content[end..].trim()
        ),
        None => format!("{content}\n\n{banner}"),
    }
}

/// `path` as written under the project: left alone when already under
/// `docs/`, otherwise prefixed with the effective docs folder, if any.
pub fn output_path(path: &str, folder: Option<&str>) -> String {
    let path = path.trim();
    match folder.filter(|f| !f.trim().is_empty()) {
        Some(folder) if !path.starts_with("docs/") => {
            format!("{}{}", paths::docs_prefix(folder), path.trim_start_matches('/'))
        }
        _ => path.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

pub fn synthesize(input: &SimulationInput<'_>) -> Result<SimulationReport> {
    let mut report = SimulationReport::default();

    match input.agent_id.or(input.agent.map(|a| a.id.as_str())) {
        Some(agent_id) => {
            let agent_folder = input
                .docs_folder_override
                .or(input.agent.and_then(|a| a.docs_folder.as_deref()));
            for rel in input.store.list_fragments(agent_id)? {
                let Some(content) = input.store.read_fragment(agent_id, &rel)? else {
                    continue;
                };
                let parsed = frontmatter::parse(&content);
                let Some(fm) = parsed.frontmatter else {
                    continue;
                };
                let Some(output_file) = fm.output_file() else {
                    continue;
                };
                let folder = fm.docs_folder().or(agent_folder);
                let path = output_path(output_file, folder);
                let file_name = rel.rsplit('/').next().unwrap_or(&rel).to_string();
                let body = example_section(&content).unwrap_or_else(|| {
                    format!(
                        "<!-- Mock Content for {path} -->\n\n# Generated by Simulation Mode\n\n\
                         (No example content found in {file_name})"
                    )
                });
                let body = inject_banner(&body, input.raw_prompt);
                write(input.project, &mut report, path, Some(file_name), &body);
            }
        }
        None => {
            let parsed = frontmatter::parse(input.raw_prompt);
            if let Some(output_file) = parsed.frontmatter.as_ref().and_then(|f| f.output_file()) {
                let path = output_path(output_file, input.docs_folder_override);
                let body = example_section(input.interpolated_prompt).unwrap_or_else(|| {
                    format!("<!-- Mock Content for {path} -->\n\n# Generated by Simulation Mode")
                });
                let body = inject_banner(&body, input.raw_prompt);
                write(input.project, &mut report, path, None, &body);
            }
        }
    }

    Ok(report)
}

fn write(
    project: &dyn ProjectStore,
    report: &mut SimulationReport,
    path: String,
    source: Option<String>,
    body: &str,
) {
    match project.write_file(&path, body) {
        Ok(()) => {
            tracing::info!(path = %path, source = ?source, "simulated artifact");
            report.written.push(SimulatedWrite { path, source });
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "simulated artifact failed");
            report.failures.push(SimulationFailure {
                path,
                source,
                error: e.to_string(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
