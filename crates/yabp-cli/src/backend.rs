use agent_runner::RunOptions;
use yabp_core::dispatch::{ExecutionBackend, ExecutionRequest, ProcessOutput};
use yabp_core::YabpError;

/// Live backend: drives the agent CLI through `agent-runner` on a private
/// tokio runtime.
pub struct AgentCliBackend {
    rt: tokio::runtime::Runtime,
}

impl AgentCliBackend {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            rt: tokio::runtime::Runtime::new()?,
        })
    }
}

impl ExecutionBackend for AgentCliBackend {
    fn execute(&self, request: &ExecutionRequest) -> yabp_core::Result<ProcessOutput> {
        let opts = RunOptions {
            executable: request.command.clone(),
            instruction: request.instruction.clone(),
            cwd: Some(request.working_dir.clone()),
            env: request.env.clone(),
        };
        tracing::debug!(cwd = %request.working_dir.display(), "handing prompt to agent-runner");
        let out = self
            .rt
            .block_on(agent_runner::run(opts))
            .map_err(|e| YabpError::Backend(e.to_string()))?;
        Ok(ProcessOutput {
            transcript: out.transcript,
            exit_code: out.exit_code,
        })
    }
}
