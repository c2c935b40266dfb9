//! CoffeeScript compiler driven through the `coffee` command line tool.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::tool::{ProcessRunner, ToolCommand, ToolRunner};
use crate::mapping::{CompileUnit, PathMapper, RootRegistry};
use crate::watcher::{AssetCompiler, CompileFailure, CompileOutcome, DeleteOutcome};

/// Compiles `.coffee` sources into `.js` (plus source map) artifacts.
///
/// Each created or updated file is compiled on its own into the mirrored
/// destination directory; deleting a source removes its artifact directly.
pub struct CoffeeScriptCompiler {
    registry: Arc<RootRegistry>,
    mapper: PathMapper,
    command: ToolCommand,
    runner: Arc<dyn ToolRunner>,
}

impl CoffeeScriptCompiler {
    pub const NAME: &'static str = "coffeescript";

    /// Create a compiler running `command` as a child process.
    pub fn new(registry: Arc<RootRegistry>, command: ToolCommand) -> Self {
        Self {
            registry,
            mapper: PathMapper::new("coffee", "js"),
            command,
            runner: Arc::new(ProcessRunner::new()),
        }
    }

    /// Replace the source/target extension mapping.
    pub fn with_mapper(mut self, mapper: PathMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Replace how the tool is run.
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// Resolve the compile unit for `path`, or `None` when unmapped.
    pub fn resolve(&self, path: &Path) -> Option<CompileUnit> {
        CompileUnit::resolve(path, &self.registry, &self.mapper)
    }
}

#[async_trait]
impl AssetCompiler for CoffeeScriptCompiler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn accept(&self, path: &Path) -> bool {
        self.mapper.has_source_extension(path)
    }

    async fn compile(&self, path: &Path) -> Result<CompileOutcome, CompileFailure> {
        let Some(unit) = self.resolve(path) else {
            crate::debug_event!(Self::NAME, "unmapped", "{}", path.display());
            return Ok(CompileOutcome::Unmapped);
        };

        crate::log_event!(
            Self::NAME,
            "compiling",
            "{} to {}",
            unit.input.display(),
            unit.output.display()
        );

        let invocation = self.command.compile(&unit.output_dir, &unit.input);
        let result = self.runner.run(&invocation).await.map_err(|e| {
            CompileFailure::for_path(
                path,
                format!("cannot run {}: {e}", self.command.program().display()),
            )
        })?;

        if !result.success() {
            return Err(CompileFailure::for_path(path, result.diagnostic()));
        }

        Ok(CompileOutcome::Compiled(unit))
    }

    async fn delete(&self, path: &Path) -> Result<DeleteOutcome, CompileFailure> {
        let Some(unit) = self.resolve(path) else {
            crate::debug_event!(Self::NAME, "unmapped", "{}", path.display());
            return Ok(DeleteOutcome::Unmapped);
        };

        for map in unit.source_maps() {
            match tokio::fs::remove_file(&map).await {
                Ok(()) => crate::debug_event!(Self::NAME, "removed", "{}", map.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("[{}] cannot remove {}: {e}", Self::NAME, map.display()),
            }
        }

        match tokio::fs::remove_file(&unit.output).await {
            Ok(()) => {
                crate::log_event!(Self::NAME, "removed", "{}", unit.output.display());
                Ok(DeleteOutcome::Removed(unit.output))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::Absent),
            Err(e) => Err(CompileFailure::for_path(
                path,
                format!("cannot remove {}: {e}", unit.output.display()),
            )),
        }
    }
}
