//! `agent-runner`: async driver for the external coding-agent CLI.
//!
//! Spawns the agent as `<exe> -p -f <instruction>` in the project
//! directory, closes its stdin, and collects stdout and stderr into one
//! transcript until the process exits.
//!
//! # Architecture
//!
//! ```text
//! RunOptions
//!     │
//!     ▼
//! resolve_executable  ← explicit command, else PATH, else ~/.local/bin
//!     │
//!     ▼
//! AgentProcess        ← tokio::process child, two reader tasks + mpsc
//!     │
//!     ▼
//! RunOutput           ← transcript (stderr prefixed), exit code
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use agent_runner::{run, RunOptions};
//!
//! let out = run(RunOptions {
//!     instruction: "Please execute the instructions defined in the file: /p/logs/x.md".into(),
//!     cwd: Some("/p".into()),
//!     ..Default::default()
//! })
//! .await?;
//! println!("{}\n[Process exited with code {:?}]", out.transcript, out.exit_code);
//! ```

pub mod error;
pub mod runner;
pub mod types;

pub(crate) mod process;

pub use error::RunnerError;
pub use runner::{build_command, resolve_executable, run, DEFAULT_COMMAND};
pub use types::{RunOptions, RunOutput};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, RunnerError>;
