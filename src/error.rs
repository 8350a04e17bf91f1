//! Error types for generation runs.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = GenFilesError> = std::result::Result<T, E>;

/// Errors raised while staging, running scripts, or reconciling files.
#[derive(Debug, Error)]
pub enum GenFilesError {
    #[error("path `{0}` escapes the generated files directory")]
    PathEscape(String),

    #[error("empty file path")]
    EmptyPath,

    #[error("invalid open mode `{0}`")]
    InvalidMode(String),

    #[error("no such file: `{0}`")]
    NotFound(String),

    #[error("Script {script:?} caused exit({status})")]
    ScriptExit { script: PathBuf, status: String },

    /// Uncaught script error, passed through with its own message.
    #[error(transparent)]
    ScriptRuntime(anyhow::Error),

    #[error("another generation run is already active")]
    AlreadyActive,

    #[error("file handles from the generation run are still in use")]
    StillInUse,

    #[error("IO error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

impl GenFilesError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(path.into(), err)
    }

    /// Errors that must abort the run even when a script catches them.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::PathEscape(_))
    }
}
