use std::path::PathBuf;
use thiserror::Error;

/// Failures while tail-reading a transcript.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Transcript not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading transcript: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DetectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// A transcript that simply isn't there yet is routine, not worth a warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures while querying git for branch and dirty state.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Not a git repository: {dir}")]
    NotARepository { dir: PathBuf },

    #[error("Failed to run git in {dir}: {message}")]
    Spawn { dir: PathBuf, message: String },

    #[error("git timed out after {millis}ms in {dir}")]
    TimedOut { dir: PathBuf, millis: u128 },
}

impl ProbeError {
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotARepository { .. })
    }
}
