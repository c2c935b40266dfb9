//! npm-backed tool installation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use tokio::process::Command;

use super::{ProvisionError, ToolProvisioner};
use crate::compiler::ToolCommand;

/// One install lock per install directory, shared across provisioners so two
/// sessions on the same project never run npm concurrently.
static INSTALL_LOCKS: LazyLock<parking_lot::Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
    LazyLock::new(|| parking_lot::Mutex::new(HashMap::new()));

fn install_lock(dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
    INSTALL_LOCKS
        .lock()
        .entry(dir.to_path_buf())
        .or_default()
        .clone()
}

/// Installs npm packages into a project-local prefix.
///
/// The package is installed with `npm install --prefix <install_dir>` unless
/// the requested version is already present, and the command is resolved
/// from `<install_dir>/node_modules/.bin`.
#[derive(Debug, Clone)]
pub struct NpmProvisioner {
    install_dir: PathBuf,
    command: String,
    npm: PathBuf,
}

impl NpmProvisioner {
    /// Provision `command` (the package's binary name) under `install_dir`.
    pub fn new(install_dir: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            install_dir: install_dir.into(),
            command: command.into(),
            npm: PathBuf::from(if cfg!(windows) { "npm.cmd" } else { "npm" }),
        }
    }

    /// Use a specific npm executable.
    pub fn with_npm(mut self, npm: impl Into<PathBuf>) -> Self {
        self.npm = npm.into();
        self
    }

    /// Path of the package manifest for `name` inside the prefix.
    fn manifest_path(&self, name: &str) -> PathBuf {
        self.install_dir
            .join("node_modules")
            .join(name)
            .join("package.json")
    }

    /// Version of `name` currently installed in the prefix, if any.
    pub fn installed_version(&self, name: &str) -> Option<String> {
        let content = std::fs::read_to_string(self.manifest_path(name)).ok()?;
        let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
        manifest
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// Executable the package exposes in `node_modules/.bin`.
    pub fn executable(&self) -> PathBuf {
        let bin = self.install_dir.join("node_modules").join(".bin");
        if cfg!(windows) {
            bin.join(format!("{}.cmd", self.command))
        } else {
            bin.join(&self.command)
        }
    }

    async fn run_npm_install(&self, name: &str, version: &str) -> Result<(), ProvisionError> {
        tokio::fs::create_dir_all(&self.install_dir)
            .await
            .map_err(|source| ProvisionError::InstallDir {
                path: self.install_dir.clone(),
                source,
            })?;

        crate::log_event!(
            "provision",
            "installing",
            "{name}@{version} into {}",
            self.install_dir.display()
        );

        let output = Command::new(&self.npm)
            .arg("install")
            .arg(format!("{name}@{version}"))
            .arg("--prefix")
            .arg(&self.install_dir)
            .arg("--no-save")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProvisionError::NpmUnavailable {
                program: self.npm.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProvisionError::InstallFailed {
                package: name.to_string(),
                version: version.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ToolProvisioner for NpmProvisioner {
    async fn install(&self, name: &str, version: &str) -> Result<ToolCommand, ProvisionError> {
        let lock = install_lock(&self.install_dir);
        let _guard = lock.lock().await;

        if self.installed_version(name).as_deref() == Some(version) {
            crate::debug_event!("provision", "up to date", "{name}@{version}");
        } else {
            self.run_npm_install(name, version).await?;
        }

        let executable = self.executable();
        if !executable.exists() {
            return Err(ProvisionError::ExecutableMissing { path: executable });
        }

        Ok(ToolCommand::new(executable))
    }
}
