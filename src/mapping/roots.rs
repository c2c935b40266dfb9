//! Ordered registry of source/destination root pairs.

use std::path::{Path, PathBuf};

/// A source root paired with the destination root that mirrors it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMapping {
    /// Short name used in log lines ("internal", "external").
    pub label: String,
    /// Directory tree holding source files.
    pub source: PathBuf,
    /// Directory tree receiving compiled artifacts.
    pub destination: PathBuf,
}

impl RootMapping {
    pub fn new(
        label: impl Into<String>,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Whether `path` lies strictly below this mapping's source root.
    ///
    /// Comparison is component-wise: `/a/src-old/x` is not under `/a/src`.
    pub fn contains(&self, path: &Path) -> bool {
        path.strip_prefix(&self.source)
            .map(|relative| relative.components().next().is_some())
            .unwrap_or(false)
    }
}

/// Registry of root mappings, in declaration order.
///
/// Built once from configuration and never mutated afterwards; share it
/// behind an `Arc` between the watcher and compilers.
#[derive(Debug, Clone, Default)]
pub struct RootRegistry {
    mappings: Vec<RootMapping>,
}

impl RootRegistry {
    /// Create a registry from mappings in declaration order.
    pub fn new(mappings: impl IntoIterator<Item = RootMapping>) -> Self {
        Self {
            mappings: mappings.into_iter().collect(),
        }
    }

    /// All mappings, in declaration order.
    pub fn mappings(&self) -> &[RootMapping] {
        &self.mappings
    }

    /// First declared mapping whose source root contains `path`.
    pub fn find(&self, path: &Path) -> Option<&RootMapping> {
        self.mappings.iter().find(|m| m.contains(path))
    }

    /// Number of configured mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Compute the minimal set of existing directories to watch recursively.
    ///
    /// Each source root is watched through its parent directory, or the
    /// nearest ancestor of it that exists, so a root created, removed or
    /// recreated while watching is still seen. Anchors nested inside another
    /// anchor are left out so each file change is reported once. Events for
    /// paths outside every root are dropped by the mapper.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let anchors: Vec<PathBuf> = self
            .mappings
            .iter()
            .filter_map(|m| watch_anchor(&m.source))
            .collect();

        let mut roots: Vec<PathBuf> = Vec::new();
        for anchor in &anchors {
            let nested = anchors
                .iter()
                .any(|other| other != anchor && anchor.starts_with(other));
            if !nested && !roots.contains(anchor) {
                roots.push(anchor.clone());
            }
        }

        roots
    }
}

/// Closest existing directory above `source`.
fn watch_anchor(source: &Path) -> Option<PathBuf> {
    source
        .parent()
        .unwrap_or(source)
        .ancestors()
        .find(|dir| dir.is_dir())
        .map(Path::to_path_buf)
}
