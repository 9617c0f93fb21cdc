//! Execution dispatch: assemble a prompt, log it, then either hand it to a
//! live backend or simulate its artifacts.
//!
//! ```text
//! Assembling ──► Dispatched ──► Completed
//!                          └──► Failed
//! ```

use crate::assembler::{self, AssembleInput, AssembledPrompt};
use crate::config::Settings;
use crate::error::{Result, YabpError};
use crate::project::{ProjectConfig, ProjectStore};
use crate::simulate::{self, SimulationInput, SimulationReport};
use crate::store::TemplateStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CURSOR_API_KEY_ENV: &str = "CURSOR_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// What a live backend is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Single-line instruction pointing at the execution log.
    pub instruction: String,
    pub working_dir: PathBuf,
    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,
    /// Explicit executable from settings, if any.
    pub command: Option<String>,
}

/// Captured output of one backend process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessOutput {
    /// Stdout verbatim, interleaved with stderr chunks prefixed `[STDERR]: `,
    /// in arrival order.
    pub transcript: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

pub trait ExecutionBackend {
    /// Run to completion. `Err` only when the process could not be started
    /// or its output could not be read.
    fn execute(&self, request: &ExecutionRequest) -> Result<ProcessOutput>;
}

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Simulate,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Assembling,
    Dispatched,
    Completed,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub prompt: &'a str,
    pub agent_id: Option<&'a str>,
    pub mode: RunMode,
    pub docs_folder: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub state: ExecutionState,
    pub mode: RunMode,
    /// Absolute path of the execution log.
    pub log_path: PathBuf,
    /// Log path relative to the project root.
    pub log_file: String,
    pub prompt: AssembledPrompt,
    /// Backend transcript with exit annotation, or the simulation summary.
    pub output: String,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationReport>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher<'a> {
    store: &'a dyn TemplateStore,
    settings: &'a Settings,
    backend: Option<&'a dyn ExecutionBackend>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(store: &'a dyn TemplateStore, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: &'a dyn ExecutionBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn run(
        &self,
        project: &dyn ProjectStore,
        project_name: &str,
        request: &RunRequest<'_>,
    ) -> Result<RunOutcome> {
        let backend = match request.mode {
            RunMode::Live => Some(self.backend.ok_or(YabpError::BackendUnavailable)?),
            RunMode::Simulate => None,
        };

        // Assembling
        let config = project.read_config().unwrap_or_else(|e| {
            tracing::warn!(project = project_name, error = %e, "unreadable project config, using defaults");
            ProjectConfig::default()
        });
        let context = project.read_context().unwrap_or_else(|e| {
            tracing::warn!(project = project_name, error = %e, "unreadable project context, ignored");
            Default::default()
        });
        let agent = match request.agent_id {
            Some(id) => {
                let agent = self.store.load_agent(id)?;
                if agent.is_none() {
                    tracing::warn!(
                        agent = id,
                        "agent has no metadata; running without its docs folder or instructions"
                    );
                }
                agent
            }
            None => None,
        };

        let assembled = assembler::assemble(&AssembleInput {
            raw: request.prompt,
            config: &config,
            context: &context,
            project_name,
            agent: agent.as_ref(),
            docs_folder_override: request.docs_folder,
            project,
        })?;
        let log_path = assembler::write_execution_log(
            project.root(),
            request.agent_id,
            &assembled.text,
            Utc::now(),
        )?;
        let log_file = log_path
            .strip_prefix(project.root())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| log_path.display().to_string());

        // Dispatched
        tracing::info!(
            project = project_name,
            agent = request.agent_id.unwrap_or("custom"),
            mode = ?request.mode,
            log = %log_file,
            "dispatched prompt"
        );

        let outcome = match backend {
            Some(backend) => {
                let exec = ExecutionRequest {
                    instruction: format!(
                        "Please execute the instructions defined in the file: {}",
                        log_path.display()
                    ),
                    working_dir: project.root().to_path_buf(),
                    env: self.credential_env(),
                    command: self.settings.agent_command.clone(),
                };
                match backend.execute(&exec) {
                    Ok(out) => {
                        let code = out
                            .exit_code
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| "null".to_string());
                        RunOutcome {
                            state: ExecutionState::Completed,
                            mode: RunMode::Live,
                            log_path,
                            log_file,
                            prompt: assembled,
                            output: format!("{}\n[Process exited with code {code}]", out.transcript),
                            exit_code: out.exit_code,
                            simulation: None,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(project = project_name, error = %e, "backend failed to run");
                        RunOutcome {
                            state: ExecutionState::Failed,
                            mode: RunMode::Live,
                            log_path,
                            log_file,
                            prompt: assembled,
                            output: format!("\n[Spawn Error]: {e}"),
                            exit_code: None,
                            simulation: None,
                        }
                    }
                }
            }
            None => {
                let report = simulate::synthesize(&SimulationInput {
                    agent_id: request.agent_id,
                    agent: agent.as_ref(),
                    store: self.store,
                    raw_prompt: request.prompt,
                    interpolated_prompt: &assembled.interpolated,
                    docs_folder_override: request.docs_folder,
                    project,
                })?;
                let mut output = format!("Job file created at {log_file}");
                for line in report.lines() {
                    output.push_str("\n\n");
                    output.push_str(&line);
                }
                RunOutcome {
                    state: ExecutionState::Completed,
                    mode: RunMode::Simulate,
                    log_path,
                    log_file,
                    prompt: assembled,
                    output,
                    exit_code: None,
                    simulation: Some(report),
                }
            }
        };

        tracing::info!(project = project_name, state = ?outcome.state, "execution finished");
        Ok(outcome)
    }

    fn credential_env(&self) -> Vec<(String, String)> {
        match self.settings.credential() {
            Some(key) => vec![
                (CURSOR_API_KEY_ENV.to_string(), key.to_string()),
                (OPENAI_API_KEY_ENV.to_string(), key.to_string()),
            ],
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
