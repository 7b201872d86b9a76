use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployqError {
    #[error("config not found: {0} (pass --config or set DEPLOYQ_CONFIG)")]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("list '{0}' not found on board")]
    MissingList(String),

    #[error("board returned {status} for {endpoint}: {body}")]
    BoardStatus {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("user name must not be empty")]
    EmptyUser,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeployqError {
    /// True for failures talking to the board service. These are transient:
    /// the next tick re-derives state and retries whatever is still needed.
    pub fn is_board_failure(&self) -> bool {
        matches!(
            self,
            DeployqError::Http(_) | DeployqError::BoardStatus { .. } | DeployqError::CardNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DeployqError>;
