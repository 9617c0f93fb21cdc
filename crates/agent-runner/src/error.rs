use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("agent executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Process error: {0}")]
    Process(String),
}
