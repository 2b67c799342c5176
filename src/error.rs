use std::path::PathBuf;

/// Failure of a single orchestrator operation. Nothing is retried; every variant is terminal
/// for the invocation that produced it.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error("version check failed: {0}")]
    VersionIncompatible(String),

    #[error("{tool} exited with failure: {stderr}")]
    ProcessFailure { tool: String, stderr: String },

    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backup file not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("backup file {} is not usable: {reason}", .path.display())]
    ArtifactInvalid { path: PathBuf, reason: String },

    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table identifier '{0}', expected schema.table")]
    MalformedIdentifier(String),

    #[error("input not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("nothing to do: {0}")]
    NothingToDo(String),

    #[error("{failed} of {total} items failed")]
    PartialBatchFailure { failed: usize, total: usize },
}

pub type OpResult<T> = Result<T, OpError>;
