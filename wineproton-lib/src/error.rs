//! Error types for the environment manager

use std::path::PathBuf;
use thiserror::Error;

/// Manager result type
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Main error type for manager operations
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Environment '{0}' is built in and cannot be removed")]
    ProtectedEnvironment(String),

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("Required tool not found: {tool} ({hint})")]
    MissingTool { tool: String, hint: String },

    #[error("File does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Command execution failed: {command} - {error}")]
    CommandExecution { command: String, error: String },

    #[error("Command failed with exit code {code:?}: {output}")]
    CommandFailed { code: Option<i32>, output: String },

    #[error("Nothing to install: the queue is empty")]
    EmptyQueue,

    #[error("Failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
