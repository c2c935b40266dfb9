//! Making sure the external tool is installed before anything is compiled.

mod npm;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::compiler::ToolCommand;

pub use npm::NpmProvisioner;

/// Provisioning failures. Fatal: a session cannot start without its tool.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Cannot run npm ({program}): {reason}")]
    NpmUnavailable { program: PathBuf, reason: String },

    #[error("Failed to install {package}@{version}: {message}")]
    InstallFailed {
        package: String,
        version: String,
        message: String,
    },

    #[error("Tool executable not found at {path}")]
    ExecutableMissing { path: PathBuf },

    #[error("Cannot prepare install directory {path}: {source}")]
    InstallDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Installs a named tool at a given version and tells how to run it.
#[async_trait]
pub trait ToolProvisioner: Send + Sync {
    async fn install(&self, name: &str, version: &str) -> Result<ToolCommand, ProvisionError>;
}

/// Uses an executable that is already installed.
#[derive(Debug, Clone)]
pub struct StaticProvisioner {
    command: ToolCommand,
}

impl StaticProvisioner {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ToolProvisioner for StaticProvisioner {
    async fn install(&self, name: &str, _version: &str) -> Result<ToolCommand, ProvisionError> {
        let program = self.command.program();

        // Bare names are resolved through PATH when the tool first runs
        if program.components().count() > 1 && !program.exists() {
            return Err(ProvisionError::ExecutableMissing {
                path: program.to_path_buf(),
            });
        }

        crate::debug_event!("provision", "using", "{name} at {}", program.display());
        Ok(self.command.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_static_provisioner_accepts_bare_names() {
        let provisioner = StaticProvisioner::new(ToolCommand::new("coffee"));
        let command = provisioner.install("coffee-script", "1.6.3").await.unwrap();
        assert_eq!(command, ToolCommand::new("coffee"));
    }

    #[tokio::test]
    async fn test_static_provisioner_rejects_missing_paths() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("bin/coffee");
        let provisioner = StaticProvisioner::new(ToolCommand::new(&missing));

        let err = provisioner.install("coffee-script", "1.6.3").await.unwrap_err();
        assert!(matches!(err, ProvisionError::ExecutableMissing { path } if path == missing));
    }
}
