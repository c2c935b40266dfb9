//! Startup pass compiling every existing source root in one go.

use std::sync::Arc;

use walkdir::WalkDir;

use super::tool::{ToolCommand, ToolRunner};
use crate::mapping::{RootMapping, RootRegistry};
use crate::watcher::CompileFailure;

/// Roots handled by a batch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Labels of roots compiled, in declaration order.
    pub compiled: Vec<String>,
    /// Labels of roots skipped because their source directory is missing.
    pub skipped: Vec<String>,
}

/// Runs the tool once per existing source root, directory-level.
pub struct BatchCompiler {
    registry: Arc<RootRegistry>,
    command: ToolCommand,
    runner: Arc<dyn ToolRunner>,
    source_extension: String,
}

impl BatchCompiler {
    pub fn new(
        registry: Arc<RootRegistry>,
        command: ToolCommand,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        Self {
            registry,
            command,
            runner,
            source_extension: "coffee".to_string(),
        }
    }

    /// Extension counted when reporting how many sources a root holds.
    pub fn with_source_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = extension.into();
        self
    }

    /// Compile every root whose source directory exists.
    ///
    /// Stops at the first root the tool fails on.
    pub async fn run(&self) -> Result<BatchReport, CompileFailure> {
        let mut report = BatchReport::default();

        for mapping in self.registry.mappings() {
            if !mapping.source.is_dir() {
                crate::debug_event!(
                    "batch",
                    "skipped",
                    "{} ({} missing)",
                    mapping.label,
                    mapping.source.display()
                );
                report.skipped.push(mapping.label.clone());
                continue;
            }

            self.compile_root(mapping).await?;
            report.compiled.push(mapping.label.clone());
        }

        Ok(report)
    }

    async fn compile_root(&self, mapping: &RootMapping) -> Result<(), CompileFailure> {
        crate::log_event!(
            "batch",
            "compiling",
            "{} files from {}",
            self.count_sources(mapping),
            mapping.source.display()
        );

        let invocation = self.command.compile(&mapping.destination, &mapping.source);
        let result = self.runner.run(&invocation).await.map_err(|e| {
            CompileFailure::for_path(
                &mapping.source,
                format!("cannot run {}: {e}", self.command.program().display()),
            )
        })?;

        if !result.success() {
            return Err(CompileFailure::for_path(&mapping.source, result.diagnostic()));
        }

        Ok(())
    }

    fn count_sources(&self, mapping: &RootMapping) -> usize {
        WalkDir::new(&mapping.source)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext == self.source_extension.as_str())
                    .unwrap_or(false)
            })
            .count()
    }
}
