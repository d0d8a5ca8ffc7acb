//! Error types shared by the navigation and transfer engine

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LotusError {
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Invalid name: '{0}'")]
    InvalidName(String),

    #[error("Clipboard is empty")]
    EmptyClipboard,

    #[error("Could not move {} across devices: {reason}", .path.display())]
    CrossDeviceMove { path: PathBuf, reason: String },

    #[error("Cannot paste {} into itself", .0.display())]
    NestedDestination(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Trash error on {}: {message}", .path.display())]
    Trash { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Category of a [`LotusError`], usable without owning the error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NotADirectory,
    AlreadyExists,
    PermissionDenied,
    InvalidName,
    EmptyClipboard,
    CrossDeviceMove,
    NestedDestination,
    Cancelled,
    Io,
    Trash,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::NotADirectory => "not a directory",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::InvalidName => "invalid name",
            ErrorKind::EmptyClipboard => "empty clipboard",
            ErrorKind::CrossDeviceMove => "cross-device move",
            ErrorKind::NestedDestination => "nested destination",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Io => "i/o error",
            ErrorKind::Trash => "trash error",
            ErrorKind::Config => "configuration error",
        };
        f.write_str(label)
    }
}

impl LotusError {
    /// Classifies an I/O error raised while touching `path`
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => LotusError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => LotusError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => LotusError::AlreadyExists(path.to_path_buf()),
            _ => LotusError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LotusError::NotFound(_) => ErrorKind::NotFound,
            LotusError::NotADirectory(_) => ErrorKind::NotADirectory,
            LotusError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            LotusError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            LotusError::InvalidName(_) => ErrorKind::InvalidName,
            LotusError::EmptyClipboard => ErrorKind::EmptyClipboard,
            LotusError::CrossDeviceMove { .. } => ErrorKind::CrossDeviceMove,
            LotusError::NestedDestination(_) => ErrorKind::NestedDestination,
            LotusError::Cancelled => ErrorKind::Cancelled,
            LotusError::Io { .. } => ErrorKind::Io,
            LotusError::Trash { .. } => ErrorKind::Trash,
            LotusError::ConfigError(_) => ErrorKind::Config,
        }
    }
}

/// Failure recorded against a single item of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&LotusError> for FailureReason {
    fn from(err: &LotusError) -> Self {
        FailureReason {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<LotusError> for FailureReason {
    fn from(err: LotusError) -> Self {
        FailureReason::from(&err)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type Result<T> = std::result::Result<T, LotusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_known_kinds() {
        let path = Path::new("/tmp/x");

        let err = LotusError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = LotusError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let err = LotusError::from_io(path, io::Error::from(io::ErrorKind::AlreadyExists));
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_from_io_falls_back_to_io() {
        let err = LotusError::from_io(Path::new("/tmp/x"), io::Error::other("disk on fire"));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_failure_reason_keeps_kind_and_message() {
        let reason = FailureReason::from(LotusError::AlreadyExists(PathBuf::from("/a/b")));
        assert_eq!(reason.kind, ErrorKind::AlreadyExists);
        assert!(reason.message.contains("/a/b"));
    }
}
