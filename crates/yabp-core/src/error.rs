use thiserror::Error;

#[derive(Debug, Error)]
pub enum YabpError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("agent already exists: {0}")]
    AgentExists(String),

    #[error("prompt not found: {agent}/{file}")]
    FragmentNotFound { agent: String, file: String },

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid path '{0}': must be relative and stay inside the project")]
    InvalidPath(String),

    #[error("invalid name '{0}': must contain at least one letter or digit")]
    InvalidName(String),

    #[error("invalid setting '{0}'")]
    InvalidSetting(String),

    #[error("live execution requested but no execution backend is configured")]
    BackendUnavailable,

    #[error("execution backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, YabpError>;
