//! Incremental compilation of web assets driven by filesystem events.
//!
//! A [`session::WatchSession`] provisions the external compiler, compiles
//! every source root once, and then hands a [`watcher::Watcher`] the roots to
//! watch. Each changed source is recompiled into its mirrored destination and
//! each deleted source has its artifact removed.

pub mod cli;
pub mod compiler;
pub mod config;
pub mod logging;
pub mod mapping;
pub mod provision;
pub mod session;
pub mod watcher;

pub use compiler::{BatchCompiler, BatchReport, CoffeeScriptCompiler, ToolCommand, ToolRunner};
pub use config::Settings;
pub use mapping::{CompileUnit, PathMapper, RootMapping, RootRegistry};
pub use provision::{NpmProvisioner, ProvisionError, StaticProvisioner, ToolProvisioner};
pub use session::{SessionError, WatchSession};
pub use watcher::{
    AssetCompiler, CompileFailure, CompileOutcome, DeleteOutcome, NoticeBroadcaster, WatchError,
    WatchNotice, Watcher, WatcherHandle, WatcherState,
};
