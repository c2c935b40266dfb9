//! Pure source-path to artifact-path mapping.

use std::path::{Path, PathBuf};

use super::RootRegistry;

/// Maps source files to artifact paths by swapping one extension suffix.
///
/// Performs no I/O: the same input and registry always give the same
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    source_extension: String,
    target_extension: String,
}

impl PathMapper {
    /// Create a mapper for `source_extension` -> `target_extension`.
    ///
    /// Extensions are given without the leading dot (`"coffee"`, `"js"`).
    pub fn new(source_extension: impl Into<String>, target_extension: impl Into<String>) -> Self {
        Self {
            source_extension: normalize_extension(source_extension.into()),
            target_extension: normalize_extension(target_extension.into()),
        }
    }

    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    pub fn target_extension(&self) -> &str {
        &self.target_extension
    }

    /// Whether `path` carries the source extension.
    pub fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext == self.source_extension.as_str())
            .unwrap_or(false)
    }

    /// Map `input` to its artifact path, or `None` when it is unmapped.
    ///
    /// The first mapping (in declaration order) whose source root is a
    /// component-wise prefix of `input` is used. `None` is returned when no
    /// root matches, when `input` is a root itself, or when the file name
    /// does not end in the source extension.
    pub fn map(&self, input: &Path, registry: &RootRegistry) -> Option<PathBuf> {
        let mapping = registry.find(input)?;
        let relative = input.strip_prefix(&mapping.source).ok()?;

        // Works on the raw OS string, so non-UTF-8 names map too
        if !self.has_source_extension(relative) {
            return None;
        }
        let mut renamed = relative.file_stem()?.to_os_string();
        renamed.push(".");
        renamed.push(&self.target_extension);

        Some(mapping.destination.join(relative).with_file_name(renamed))
    }
}

fn normalize_extension(ext: String) -> String {
    match ext.strip_prefix('.') {
        Some(stripped) => stripped.to_string(),
        None => ext,
    }
}

/// One file's compilation inputs and outputs.
///
/// Derived per event from a path and the registry; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Absolute source file.
    pub input: PathBuf,
    /// Artifact the external tool writes.
    pub output: PathBuf,
    /// Directory handed to the tool as its output location.
    pub output_dir: PathBuf,
}

impl CompileUnit {
    /// Resolve the unit for `input`, or `None` when the path is unmapped.
    pub fn resolve(input: &Path, registry: &RootRegistry, mapper: &PathMapper) -> Option<Self> {
        let output = mapper.map(input, registry)?;
        let output_dir = output.parent()?.to_path_buf();

        Some(Self {
            input: input.to_path_buf(),
            output,
            output_dir,
        })
    }

    /// Source maps the tool may have written next to the artifact.
    ///
    /// coffee 1.6 writes `app.map`, later releases write `app.js.map`.
    pub fn source_maps(&self) -> [PathBuf; 2] {
        let mut appended = self.output.clone().into_os_string();
        appended.push(".map");
        [self.output.with_extension("map"), PathBuf::from(appended)]
    }
}
