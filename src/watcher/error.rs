//! Error types for the watcher system.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal watcher errors. Any of these ends the watch session.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("File watch backend failed: {details}")]
    Backend { details: String },

    #[error("Watcher was dropped")]
    Closed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// A single file failed to compile or clean up.
///
/// Recoverable: reported against the file and the watch loop carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error during the compilation of {file} : {message}")]
pub struct CompileFailure {
    /// File name of the offending source (or the root, for batch passes).
    pub file: String,
    /// Diagnostic text, usually the tool's standard error.
    pub message: String,
}

impl CompileFailure {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Build a failure named after the last component of `path`.
    pub fn for_path(path: &Path, message: impl Into<String>) -> Self {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(file, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_uses_file_name() {
        let failure = CompileFailure::for_path(
            Path::new("/proj/assets/src/ui/app.coffee"),
            "SyntaxError line 4",
        );
        assert_eq!(failure.file, "app.coffee");
        assert_eq!(
            failure.to_string(),
            "Error during the compilation of app.coffee : SyntaxError line 4"
        );
    }

    #[test]
    fn test_failure_without_file_name_falls_back_to_display() {
        let failure = CompileFailure::for_path(Path::new("/"), "boom");
        assert_eq!(failure.file, "/");
    }

    #[test]
    fn test_notify_error_is_init_failure() {
        let err: WatchError = notify::Error::generic("no inotify").into();
        assert!(matches!(err, WatchError::InitFailed { .. }));
    }
}
