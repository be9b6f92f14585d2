use thiserror::Error;

/// Every failure the metrics fetch path can produce. Views do not tell these
/// apart; they only see that a fetch group failed.
#[derive(Error, Debug)]
pub enum OpsboardError {
    #[error("API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("No projects available")]
    NoProjects,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OpsboardError>;
