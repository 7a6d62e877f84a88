//! Error taxonomy for autobuild.

use std::path::PathBuf;

/// Workspace setup/cleanup failures.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace {path:?} is occupied by an unrelated non-empty directory")]
    Occupied { path: PathBuf },

    #[error("workspace {path:?} exists and is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("workspace io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Remote clone/pull failures.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("git executable not available: {0}")]
    GitUnavailable(String),

    #[error("clone target {path:?} already contains files")]
    TargetOccupied { path: PathBuf },

    #[error("repository not found at {path:?}")]
    RepositoryMissing { path: PathBuf },

    #[error("git {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("git {command} timed out after {timeout_secs} seconds")]
    TimedOut { command: String, timeout_secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Infrastructure failures while invoking the build tool.
///
/// A build that runs and reports errors is not a `BuildInvocationError`;
/// that is expressed through the interpreted error count. Messages never
/// name the configuration, which reports print next to them.
#[derive(Debug, thiserror::Error)]
pub enum BuildInvocationError {
    #[error("workspace {path:?} does not exist")]
    WorkspaceMissing { path: PathBuf },

    #[error("build tool not found: {program}")]
    ToolNotFound { program: String },

    #[error("build command is empty")]
    EmptyCommand { configuration: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build timed out after {timeout_secs} seconds")]
    TimedOut {
        configuration: String,
        timeout_secs: u64,
    },
}

/// Build output could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("build output is not text: {0}")]
    NotText(String),

    #[error("invalid marker pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Report persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Parser(#[from] ParseError),
}

/// Umbrella error for a whole autobuild run.
#[derive(Debug, thiserror::Error)]
pub enum AutobuildError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    BuildInvocation(#[from] BuildInvocationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for autobuild operations.
pub type Result<T> = std::result::Result<T, AutobuildError>;
