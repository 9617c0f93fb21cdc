//! Prompt assembly: one user prompt in, one self-contained instruction out.
//!
//! Final layout, top to bottom:
//!
//! ```text
//! # Project Context 🗂️      only when the raw prompt lists input_files
//! ---
//! # CRITICAL SYSTEM INSTRUCTION   only when the agent defines one
//! ---
//! # CRITICAL GLOBAL RULES ...
//! ---
//! <interpolated prompt>
//! # OUTPUT INSTRUCTION            only with a docs folder not yet mentioned
//! ```

use crate::agent::Agent;
use crate::error::Result;
use crate::interpolate::interpolate;
use crate::project::{ProjectConfig, ProjectStore};
use crate::{io, paths};
use chrono::{DateTime, Local, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const GLOBAL_RULES_HEADER: &str = "
# CRITICAL GLOBAL RULES (NON-NEGOTIABLE) ⚠️
1. **LANGUAGE**: All output MUST be in **ENGLISH**. No Portuguese, no Spanish. ENGLISH ONLY.
2. **DIAGRAMS**: If a diagram is requested, it MUST be generic **Mermaid**.
   - Use ```mermaid``` code blocks.
   - **NO ASCII**.
   - **STRICT SYNTAX**:
     - Quoted IDs are NOT allowed in graph definitions (e.g. `A[\"Label\"]` is GOOD, `\"A\"[\"Label\"]` is BAD).
     - Node Labels MUST be quoted (e.g. `id[\"My Label\"]`).
     - No colons in Node IDs (e.g. `Class:Method` -> BAD, `ClassMethod` -> GOOD).
3. **FILE FORMAT**: Return Markdown or Code files as requested.

---
";

const CONTEXT_HEADING: &str =
    "\n\n# Project Context 🗂️\nThe following artifacts have been created in previous phases:\n";
const SECTION_BREAK: &str = "\n\n---\n\n";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything a prompt is assembled from.
pub struct AssembleInput<'a> {
    pub raw: &'a str,
    pub config: &'a ProjectConfig,
    pub context: &'a Map<String, Value>,
    pub project_name: &'a str,
    pub agent: Option<&'a Agent>,
    /// Wins over the agent's `docs_folder`.
    pub docs_folder_override: Option<&'a str>,
    /// Source of `input_files` content.
    pub project: &'a dyn ProjectStore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputFile {
    pub path: String,
    pub found: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledPrompt {
    /// The full instruction text.
    pub text: String,
    /// The raw prompt interpolated, without any injected blocks.
    pub interpolated: String,
    /// `docs/<folder>/` when a docs folder applies.
    pub docs_prefix: Option<String>,
    pub input_files: Vec<InputFile>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub fn assemble(input: &AssembleInput<'_>) -> Result<AssembledPrompt> {
    let vars = input
        .config
        .variables_with_context(input.project_name, input.context)?;
    let interpolated = interpolate(input.raw, &vars);

    let mut body = format!("{GLOBAL_RULES_HEADER}{interpolated}");

    if let Some(instruction) = input
        .agent
        .and_then(|a| a.system_instruction.as_deref())
        .filter(|s| !s.trim().is_empty())
    {
        body = format!("\n\n# CRITICAL SYSTEM INSTRUCTION\n{instruction}{SECTION_BREAK}{body}");
    }

    let mut input_files = Vec::new();
    let requested = input_file_list(input.raw);
    if !requested.is_empty() {
        let mut block = CONTEXT_HEADING.to_string();
        for path in requested {
            match read_input_file(input.project, &path)? {
                Some(content) => {
                    block.push_str(&format!("\n## {path}\n```markdown\n{content}\n```\n"));
                    input_files.push(InputFile { path, found: true });
                }
                None => {
                    block.push_str(&format!(
                        "\n> [MISSING] {path} not found. Ensure previous steps are completed.\n"
                    ));
                    input_files.push(InputFile { path, found: false });
                }
            }
        }
        body = format!("{block}{SECTION_BREAK}{body}");
    }

    let folder = input
        .docs_folder_override
        .or_else(|| input.agent.and_then(|a| a.docs_folder.as_deref()))
        .filter(|f| !f.trim().is_empty());
    let docs_prefix = folder.map(paths::docs_prefix);
    if let Some(prefix) = &docs_prefix {
        body = with_output_footer(body, prefix);
    }

    Ok(AssembledPrompt {
        text: body,
        interpolated,
        docs_prefix,
        input_files,
    })
}

/// Append the output-location footer unless `text` already mentions
/// `prefix`. Applying it twice changes nothing.
pub fn with_output_footer(mut text: String, prefix: &str) -> String {
    if !text.contains(prefix) {
        text.push_str(&format!(
            "\n\n# OUTPUT INSTRUCTION\nIMPORTANT: Any markdown documentation created MUST be \
             saved in the `{prefix}` directory (e.g., `{prefix}my_file.md`). Do not output \
             files to the root."
        ));
    }
    text
}

static INPUT_FILES_RE: OnceLock<Regex> = OnceLock::new();
static BULLET_RE: OnceLock<Regex> = OnceLock::new();

fn input_files_re() -> &'static Regex {
    INPUT_FILES_RE.get_or_init(|| Regex::new(r"input_files:\s*\n?((?:\s*-\s*.+\n?)+)").unwrap())
}

fn bullet_re() -> &'static Regex {
    BULLET_RE.get_or_init(|| Regex::new(r"-\s*").unwrap())
}

/// Paths listed under `input_files:` in the raw prompt, in order.
pub fn input_file_list(raw: &str) -> Vec<String> {
    let Some(caps) = input_files_re().captures(raw) else {
        return Vec::new();
    };
    caps[1]
        .split('\n')
        .map(|line| bullet_re().replacen(line, 1, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

// An unreadable or escaping path counts as missing.
fn read_input_file(project: &dyn ProjectStore, path: &str) -> Result<Option<String>> {
    match project.read_file(path) {
        Ok(found) => Ok(found),
        Err(crate::error::YabpError::InvalidPath(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Execution log
// ---------------------------------------------------------------------------

/// `<timestamp>_<agent>.md`, agent defaulting to `custom`.
pub fn log_file_name(at: &DateTime<Utc>, agent_id: Option<&str>) -> String {
    let agent = paths::sanitize_for_filename(agent_id.unwrap_or("custom"));
    format!("{}_{agent}.md", paths::timestamp_slug(at))
}

/// Persist the assembled text under `.yabp/executions/`. Never overwrites:
/// a name clash gets a numeric suffix.
pub fn write_execution_log(
    project_root: &Path,
    agent_id: Option<&str>,
    text: &str,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    let content = format!(
        "# Execution Log: {}\nDate: {}\n\n## Prompt Content\n\n{text}",
        agent_id.unwrap_or("Custom Prompt"),
        at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
    );

    let dir = paths::executions_dir(project_root);
    let name = log_file_name(&at, agent_id);
    let mut path = dir.join(&name);
    let mut attempt = 0;
    loop {
        match io::write_new(&path, content.as_bytes()) {
            Ok(()) => break,
            Err(crate::error::YabpError::Io(e))
                if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 100 =>
            {
                attempt += 1;
                let stem = name.trim_end_matches(".md");
                path = dir.join(format!("{stem}-{attempt}.md"));
            }
            Err(e) => return Err(e),
        }
    }
    tracing::debug!(path = %path.display(), "wrote execution log");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
