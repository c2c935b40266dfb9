//! Watch session: provision, batch compile, then watch.

use std::sync::Arc;

use thiserror::Error;

use crate::compiler::{
    BatchCompiler, BatchReport, CoffeeScriptCompiler, ProcessRunner, ToolCommand, ToolRunner,
};
use crate::config::Settings;
use crate::mapping::RootRegistry;
use crate::provision::{NpmProvisioner, ProvisionError, StaticProvisioner, ToolProvisioner};
use crate::watcher::{CompileFailure, NoticeBroadcaster, WatchError, Watcher};

/// Failures that end a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Tool provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Startup compilation failed: {0}")]
    Batch(#[source] CompileFailure),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A watch session over one project.
///
/// The startup order is fixed: the tool is provisioned, each existing
/// source root is compiled once, and only then does live watching begin.
pub struct WatchSession {
    settings: Arc<Settings>,
    registry: Arc<RootRegistry>,
    provisioner: Arc<dyn ToolProvisioner>,
    runner: Arc<dyn ToolRunner>,
    broadcaster: NoticeBroadcaster,
}

impl WatchSession {
    /// Create a session whose provisioner and runner follow `settings`.
    pub fn new(settings: Settings) -> Self {
        let registry = Arc::new(settings.root_registry());
        let provisioner = default_provisioner(&settings);
        let runner: Arc<dyn ToolRunner> =
            Arc::new(ProcessRunner::new().with_working_dir(settings.basedir()));
        let broadcaster = NoticeBroadcaster::new(settings.watch.notice_capacity);

        Self {
            settings: Arc::new(settings),
            registry,
            provisioner,
            runner,
            broadcaster,
        }
    }

    pub fn with_provisioner(mut self, provisioner: Arc<dyn ToolProvisioner>) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &RootRegistry {
        &self.registry
    }

    /// Broadcaster the session's watcher reports to.
    pub fn broadcaster(&self) -> &NoticeBroadcaster {
        &self.broadcaster
    }

    /// Ensure the tool is installed.
    pub async fn provision(&self) -> Result<ToolCommand, SessionError> {
        let tool = &self.settings.coffeescript;
        if !tool.enabled {
            return Err(SessionError::Config(
                "the coffeescript compiler is disabled".to_string(),
            ));
        }

        let command = self.provisioner.install(&tool.package, &tool.version).await?;
        crate::log_event!(
            "provision",
            "ready",
            "{}@{} ({})",
            tool.package,
            tool.version,
            command.program().display()
        );
        Ok(command)
    }

    /// Run the startup batch pass with an already provisioned tool.
    pub async fn batch_compile(&self, command: &ToolCommand) -> Result<BatchReport, SessionError> {
        BatchCompiler::new(self.registry.clone(), command.clone(), self.runner.clone())
            .with_source_extension(self.settings.coffeescript.source_extension.clone())
            .run()
            .await
            .map_err(SessionError::Batch)
    }

    /// Provision and compile every root once, without watching.
    pub async fn compile_all(&self) -> Result<BatchReport, SessionError> {
        let command = self.provision().await?;
        self.batch_compile(&command).await
    }

    /// Provision, build the live watcher, and batch compile.
    ///
    /// Watches are registered before the batch pass, so sources edited
    /// while it runs are queued and recompiled once the watcher runs. The
    /// returned watcher has not started; call [`Watcher::run`].
    pub async fn prepare(&self) -> Result<(Watcher, BatchReport), SessionError> {
        let command = self.provision().await?;

        let roots = self.registry.watch_roots();
        if roots.is_empty() {
            tracing::warn!("[watcher] no source root has an existing parent - nothing to watch");
        }

        let compiler = CoffeeScriptCompiler::new(self.registry.clone(), command.clone())
            .with_mapper(self.settings.coffee_mapper())
            .with_runner(self.runner.clone());

        let watcher = Watcher::builder()
            .compiler(compiler)
            .roots(roots)
            .broadcaster(self.broadcaster.clone())
            .channel_capacity(self.settings.watch.channel_capacity)
            .build()?;

        let report = self.batch_compile(&command).await?;
        Ok((watcher, report))
    }
}

fn default_provisioner(settings: &Settings) -> Arc<dyn ToolProvisioner> {
    let tool = &settings.coffeescript;
    match &tool.executable {
        // Bare names stay bare so they resolve through PATH
        Some(executable) if executable.components().count() == 1 => {
            Arc::new(StaticProvisioner::new(ToolCommand::new(executable)))
        }
        Some(executable) => Arc::new(StaticProvisioner::new(ToolCommand::new(
            settings.resolve(executable),
        ))),
        None => Arc::new(NpmProvisioner::new(
            settings.resolve(&tool.install_dir),
            tool.command.clone(),
        )),
    }
}
