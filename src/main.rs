use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;

use asset_watch::Settings;
use asset_watch::cli::commands::{compile, init, watch};
use asset_watch::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force } = &cli.command {
        let basedir = match &cli.basedir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        return init::run_init(&basedir, *force);
    }

    let config = load_settings(&cli)?;
    asset_watch::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config => init::run_config(&config),
        Commands::Compile => compile::run(config).await,
        Commands::Watch { json } => watch::run(config, json).await,
    }
}

/// Load settings from `--config` or the workspace, then apply `--basedir`.
fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Settings::load_from(path).map_err(|e| anyhow!("{e}"))?;
            if config.project.basedir.is_none() {
                config.project.basedir = Some(config_basedir(path)?);
            }
            config
        }
        None => Settings::load().map_err(|e| anyhow!("Configuration error: {e}"))?,
    };

    if let Some(basedir) = &cli.basedir {
        config.project.basedir = Some(basedir.clone());
    }

    Ok(config)
}

/// Project directory for an explicit settings file: the parent of
/// `.asset-watch/` when the file lives there, else the file's own directory.
fn config_basedir(path: &std::path::Path) -> anyhow::Result<PathBuf> {
    let path = std::path::absolute(path)?;
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("Invalid config path: {}", path.display()))?;

    let base = match dir.file_name() {
        Some(name) if name == asset_watch::config::CONFIG_DIR => dir.parent().unwrap_or(dir),
        _ => dir,
    };
    Ok(base.to_path_buf())
}
