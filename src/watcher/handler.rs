//! Compiler capability trait and outcome types for the watcher.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::CompileFailure;
use crate::mapping::CompileUnit;

/// Result of a successful `compile` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The tool ran and exited cleanly.
    Compiled(CompileUnit),
    /// The path lies outside every root; nothing was started.
    Unmapped,
}

/// Result of a successful `delete` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The artifact at this path was removed.
    Removed(PathBuf),
    /// The artifact was already gone.
    Absent,
    /// The path lies outside every root.
    Unmapped,
}

/// One source format the watcher can keep compiled.
///
/// The watcher only talks to compilers through this trait: it asks each one
/// whether it accepts a path, then calls `compile` or `delete` for the
/// events it accepted, one at a time.
#[async_trait]
pub trait AssetCompiler: Send + Sync {
    /// Compiler name for logging.
    fn name(&self) -> &str;

    /// Check if this compiler handles the given path.
    fn accept(&self, path: &Path) -> bool;

    /// Compile a created or updated source file.
    async fn compile(&self, path: &Path) -> Result<CompileOutcome, CompileFailure>;

    /// Remove the artifact of a deleted source file.
    async fn delete(&self, path: &Path) -> Result<DeleteOutcome, CompileFailure>;
}
