//! File watcher that keeps compiled assets in step with their sources.
//!
//! A single notify backend feeds one sequential loop that routes events to
//! pluggable compilers, one per source format.
//!
//! # Architecture
//!
//! ```text
//! Watcher
//!   - notify::RecommendedWatcher (recursive on each source root)
//!   - bounded event channel
//!   - sequential dispatch, one event at a time
//!         |
//!    +----------+----------+
//!    |                     |
//! CoffeeScriptCompiler  (other AssetCompiler impls)
//! ```

mod error;
mod event;
mod handler;
mod notifications;
mod watch_loop;

pub use error::{CompileFailure, WatchError};
pub use event::{WatchEvent, WatchEventKind};
pub use handler::{AssetCompiler, CompileOutcome, DeleteOutcome};
pub use notifications::{NoticeBroadcaster, WatchNotice};
pub use watch_loop::{RawEvent, Watcher, WatcherBuilder, WatcherHandle, WatcherState};
