//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Incremental asset compiler driven by filesystem events
#[derive(Parser, Debug)]
#[command(
    name = "asset-watch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Compile CoffeeScript assets and keep them in step with their sources",
    long_about = "Compile every source root once, then watch the roots and recompile or \
                  delete individual artifacts as their sources change.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  asset-watch init\n  asset-watch compile\n  asset-watch watch --json\n  AW_COFFEESCRIPT__VERSION=1.12.7 asset-watch watch"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project base directory (overrides config)
    #[arg(short, long, global = true, env = "AW_BASEDIR")]
    pub basedir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .asset-watch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Compile every source root once
    #[command(about = "Provision the tool and compile all source roots")]
    Compile,

    /// Compile, then keep watching
    #[command(
        about = "Compile all source roots, then recompile on change",
        after_help = "Stop with Ctrl-C. With --json each event is printed as one JSON line."
    )]
    Watch {
        /// Print watch notices as JSON lines on stdout
        #[arg(long)]
        json: bool,
    },
}
