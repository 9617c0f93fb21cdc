use serde::Serialize;
use std::path::PathBuf;

// ─── RunOptions ───────────────────────────────────────────────────────────

/// One invocation of the agent CLI.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit executable (path or bare command name). When `None`, the
    /// default agent command is looked up on `PATH` and then under
    /// `~/.local/bin`.
    pub executable: Option<String>,
    /// Instruction handed to the agent as the `-f` argument.
    pub instruction: String,
    /// Working directory of the child process.
    pub cwd: Option<PathBuf>,
    /// Added to the inherited environment.
    pub env: Vec<(String, String)>,
}

// ─── RunOutput ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    /// Stdout verbatim with stderr chunks interleaved as `[STDERR]: <chunk>`,
    /// in the order they arrived.
    pub transcript: String,
    pub stdout: String,
    pub stderr: String,
    /// `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A piece of output from the child, tagged with its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Chunk {
    Stdout(String),
    Stderr(String),
}
