//! Configuration module for asset-watch.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `AW_` and use double underscores
//! to separate nested levels:
//! - `AW_COFFEESCRIPT__VERSION=1.12.7` sets `coffeescript.version`
//! - `AW_PROJECT__BASEDIR=/work/app` sets `project.basedir`
//! - `AW_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::mapping::{PathMapper, RootMapping, RootRegistry};

/// Directory holding the settings file, searched for from the working
/// directory upwards.
pub const CONFIG_DIR: &str = ".asset-watch";
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,

    /// Source and destination roots
    #[serde(default)]
    pub roots: RootsConfig,

    /// CoffeeScript tool settings
    #[serde(default)]
    pub coffeescript: ToolConfig,

    /// Watch loop settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProjectConfig {
    /// Project base directory; relative paths below resolve against it.
    /// Defaults to the directory holding `.asset-watch/`, else the
    /// working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basedir: Option<PathBuf>,

    /// Build output directory
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
}

/// Root pairs, relative to the base directory unless absolute.
///
/// The internal pair is declared first and wins when roots nest.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RootsConfig {
    #[serde(default = "default_internal_sources")]
    pub internal_sources: PathBuf,

    #[serde(default = "default_internal_output")]
    pub internal_output: PathBuf,

    #[serde(default = "default_external_sources")]
    pub external_sources: PathBuf,

    #[serde(default = "default_external_output")]
    pub external_output: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ToolConfig {
    /// Whether this compiler runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// npm package providing the tool
    #[serde(default = "default_package")]
    pub package: String,

    /// Package version to install
    #[serde(default = "default_tool_version")]
    pub version: String,

    /// Binary name exposed by the package
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    #[serde(default = "default_target_extension")]
    pub target_extension: String,

    /// npm prefix the package is installed into
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Use this executable instead of installing the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Raw filesystem events buffered between the backend and the loop
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Notices buffered per subscriber
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `asset_watch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_true() -> bool { true }
fn default_build_dir() -> PathBuf { PathBuf::from("target") }
fn default_internal_sources() -> PathBuf { PathBuf::from("src/main/resources") }
fn default_internal_output() -> PathBuf { PathBuf::from("target/classes") }
fn default_external_sources() -> PathBuf { PathBuf::from("src/main/assets") }
fn default_external_output() -> PathBuf { PathBuf::from("target/wisdom/assets") }
fn default_package() -> String { "coffee-script".to_string() }
fn default_tool_version() -> String { "1.6.3".to_string() }
fn default_command() -> String { "coffee".to_string() }
fn default_source_extension() -> String { "coffee".to_string() }
fn default_target_extension() -> String { "js".to_string() }
fn default_install_dir() -> PathBuf { PathBuf::from("target/node") }
fn default_channel_capacity() -> usize { 100 }
fn default_notice_capacity() -> usize { 256 }
fn default_log_level() -> String { "info".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            project: ProjectConfig::default(),
            roots: RootsConfig::default(),
            coffeescript: ToolConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            basedir: None,
            build_dir: default_build_dir(),
        }
    }
}

impl Default for RootsConfig {
    fn default() -> Self {
        Self {
            internal_sources: default_internal_sources(),
            internal_output: default_internal_output(),
            external_sources: default_external_sources(),
            external_output: default_external_output(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            package: default_package(),
            version: default_tool_version(),
            command: default_command(),
            source_extension: default_source_extension(),
            target_extension: default_target_extension(),
            install_dir: default_install_dir(),
            executable: None,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            notice_capacity: default_notice_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .asset-watch directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path).map(|mut settings| {
            // If basedir is not set in config, use the workspace
            if settings.project.basedir.is_none() {
                settings.project.basedir = Self::workspace_root();
            }
            settings
        })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Layer in environment variables with AW_ prefix
            // Use double underscore (__) to separate nested levels
            .merge(Env::prefixed("AW_").split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for .asset-watch directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .asset-watch is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Absolute project base directory.
    pub fn basedir(&self) -> PathBuf {
        let base = self
            .project
            .basedir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        if base.is_absolute() {
            base
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&base))
                .unwrap_or(base)
        }
    }

    /// Resolve a configured path against the base directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.basedir().join(path)
        }
    }

    /// Build the root registry: internal pair first, then external.
    pub fn root_registry(&self) -> RootRegistry {
        RootRegistry::new([
            RootMapping::new(
                "internal",
                self.resolve(&self.roots.internal_sources),
                self.resolve(&self.roots.internal_output),
            ),
            RootMapping::new(
                "external",
                self.resolve(&self.roots.external_sources),
                self.resolve(&self.roots.external_output),
            ),
        ])
    }

    /// Extension mapper for the CoffeeScript compiler.
    pub fn coffee_mapper(&self) -> PathMapper {
        PathMapper::new(
            self.coffeescript.source_extension.clone(),
            self.coffeescript.target_extension.clone(),
        )
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under `basedir`
    pub fn init_config_file(
        basedir: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = basedir.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.coffeescript.package, "coffee-script");
        assert_eq!(settings.coffeescript.version, "1.6.3");
        assert_eq!(settings.coffeescript.command, "coffee");
        assert_eq!(settings.roots.external_output, PathBuf::from("target/wisdom/assets"));
        assert_eq!(settings.logging.default, "info");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[project]
basedir = "/work/app"

[roots]
external_sources = "web/src"

[coffeescript]
version = "1.12.7"
executable = "/usr/local/bin/coffee"

[logging.modules]
"asset_watch::watcher" = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.project.basedir, Some(PathBuf::from("/work/app")));
        assert_eq!(settings.roots.external_sources, PathBuf::from("web/src"));
        assert_eq!(settings.coffeescript.version, "1.12.7");
        assert_eq!(
            settings.coffeescript.executable,
            Some(PathBuf::from("/usr/local/bin/coffee"))
        );
        assert_eq!(settings.logging.modules["asset_watch::watcher"], "debug");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[watch]\nchannel_capacity = 8\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.watch.channel_capacity, 8);
        assert_eq!(settings.watch.notice_capacity, 256);
        assert_eq!(settings.roots, RootsConfig::default());
        assert_eq!(settings.coffeescript, ToolConfig::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.coffeescript, ToolConfig::default());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/settings.toml");

        let mut settings = Settings::default();
        settings.coffeescript.version = "1.7.1".to_string();
        settings.watch.channel_capacity = 4;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.coffeescript.version, "1.7.1");
        assert_eq!(loaded.watch.channel_capacity, 4);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();

        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.ends_with(".asset-watch/settings.toml"));
        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_root_registry_resolves_against_basedir() {
        let mut settings = Settings::default();
        settings.project.basedir = Some(PathBuf::from("/proj"));
        settings.roots.external_output = PathBuf::from("/srv/assets");

        let registry = settings.root_registry();
        let mappings = registry.mappings();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].label, "internal");
        assert_eq!(mappings[0].source, PathBuf::from("/proj/src/main/resources"));
        assert_eq!(mappings[0].destination, PathBuf::from("/proj/target/classes"));
        assert_eq!(mappings[1].source, PathBuf::from("/proj/src/main/assets"));
        assert_eq!(mappings[1].destination, PathBuf::from("/srv/assets"));
    }
}
