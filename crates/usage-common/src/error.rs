//! Error types for the shared helpers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shared helper operations
pub type Result<T> = std::result::Result<T, UsageError>;

/// Errors raised by the checksum and file helpers
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("The given path is not a valid folder: {}", .0.display())]
    InvalidFolder(PathBuf),

    #[error("The given file path is invalid: {}", .0.display())]
    InvalidFilePath(PathBuf),

    #[error("No permission to read or write files in {}", .0.display())]
    Permission(PathBuf),
}

impl UsageError {
    /// Map an IO error raised while touching `path` to the closest variant
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::InvalidFilePath(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::Permission(path.into()),
            _ => Self::Io(err),
        }
    }
}
