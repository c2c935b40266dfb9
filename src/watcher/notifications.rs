//! Notice broadcasting for watch sessions.
//!
//! The watcher publishes what it did to a broadcast channel so the CLI,
//! tests, or an embedding build tool can observe compiles and failures
//! without being in the watch loop.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;

/// Something the watcher did or observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchNotice {
    /// Entered the Watching state.
    Started { roots: Vec<PathBuf> },
    /// A source file was compiled into `output`.
    Compiled { input: PathBuf, output: PathBuf },
    /// The artifact of a deleted source was removed.
    Deleted { output: PathBuf },
    /// A single file failed; watching continues.
    Failed { file: String, message: String },
    /// Left the Watching state.
    Stopped,
}

impl WatchNotice {
    /// Serialize as a single NDJSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Fans watch notices out to any number of subscribers.
#[derive(Clone)]
pub struct NoticeBroadcaster {
    sender: broadcast::Sender<WatchNotice>,
}

impl NoticeBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send a notice to all subscribers
    pub fn send(&self, notice: WatchNotice) {
        match self.sender.send(notice) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
            }
        }
    }

    /// Subscribe to receive notices
    pub fn subscribe(&self) -> broadcast::Receiver<WatchNotice> {
        self.sender.subscribe()
    }
}

impl Default for NoticeBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
