//! Sequential watch loop that routes events to pluggable compilers.

use std::path::PathBuf;
use std::sync::Arc;

use notify::{Event, RecursiveMode, Watcher as _};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::error::{CompileFailure, WatchError};
use super::event::{WatchEvent, WatchEventKind};
use super::handler::{AssetCompiler, CompileOutcome, DeleteOutcome};
use super::notifications::{NoticeBroadcaster, WatchNotice};

/// Raw item delivered by a watch backend.
pub type RawEvent = notify::Result<Event>;

/// Lifecycle state of a [`Watcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Stopped,
    Watching,
}

/// File watcher that feeds accepted events to compilers one at a time.
///
/// Events are handled strictly in arrival order and each compile is awaited
/// before the next event is dequeued, so a delete followed by a recreate of
/// the same file can never be reordered.
pub struct Watcher {
    /// Registered compilers.
    compilers: Vec<Arc<dyn AssetCompiler>>,
    /// Directories watched recursively by the backend.
    roots: Vec<PathBuf>,
    /// Channel for receiving raw backend events.
    event_rx: mpsc::Receiver<RawEvent>,
    /// The underlying file watcher. `None` when events are fed externally.
    backend: Option<notify::RecommendedWatcher>,
    /// Notice broadcaster for observers.
    broadcaster: NoticeBroadcaster,
    state: watch::Sender<WatcherState>,
    cancel: CancellationToken,
}

/// Handle for observing and stopping a running [`Watcher`].
#[derive(Clone)]
pub struct WatcherHandle {
    state: watch::Receiver<WatcherState>,
    cancel: CancellationToken,
}

impl WatcherHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Ask the watcher to stop.
    ///
    /// Takes effect between events; an in-flight compile runs to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait until the watcher reaches `state`.
    ///
    /// Fails with [`WatchError::Closed`] when the watcher is dropped without
    /// ever reaching it.
    pub async fn wait_for(&mut self, state: WatcherState) -> Result<(), WatchError> {
        self.state
            .wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| WatchError::Closed)
    }
}

impl Watcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> WatcherBuilder {
        WatcherBuilder::new()
    }

    /// Handle for observing state and requesting a stop.
    pub fn handle(&self) -> WatcherHandle {
        WatcherHandle {
            state: self.state.subscribe(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Process events until stopped.
    ///
    /// Returns `Ok(())` after [`WatcherHandle::stop`] or when the event
    /// stream ends, and `Err` when the watch backend fails. Per-file compile
    /// failures are reported and never end the loop.
    pub async fn run(mut self) -> Result<(), WatchError> {
        self.state.send_replace(WatcherState::Watching);
        crate::log_event!("watcher", "started", "{} roots", self.roots.len());
        self.broadcaster.send(WatchNotice::Started {
            roots: self.roots.clone(),
        });

        let result = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    crate::debug_event!("watcher", "stop requested");
                    break Ok(());
                }

                received = self.event_rx.recv() => match received {
                    Some(Ok(event)) => {
                        for watch_event in WatchEvent::from_notify(event) {
                            self.dispatch(watch_event).await;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!("[watcher] file watch backend failed: {e}");
                        break Err(WatchError::Backend {
                            details: e.to_string(),
                        });
                    }
                    None => {
                        crate::debug_event!("watcher", "event stream closed");
                        break Ok(());
                    }
                },
            }
        };

        // Release OS watches before reporting the stop
        self.backend.take();
        self.state.send_replace(WatcherState::Stopped);
        self.broadcaster.send(WatchNotice::Stopped);
        crate::log_event!("watcher", "stopped");

        result
    }

    /// Route one event to every compiler that accepts its path.
    async fn dispatch(&self, event: WatchEvent) {
        for compiler in &self.compilers {
            if !compiler.accept(&event.path) {
                continue;
            }

            match event.kind {
                WatchEventKind::Created | WatchEventKind::Updated => {
                    crate::debug_event!(compiler.name(), "changed", "{}", event.path.display());
                    match compiler.compile(&event.path).await {
                        Ok(CompileOutcome::Compiled(unit)) => {
                            self.broadcaster.send(WatchNotice::Compiled {
                                input: unit.input,
                                output: unit.output,
                            });
                        }
                        Ok(CompileOutcome::Unmapped) => {
                            crate::debug_event!(
                                compiler.name(),
                                "unmapped",
                                "{}",
                                event.path.display()
                            );
                        }
                        Err(failure) => self.report_failure(compiler.name(), failure),
                    }
                }
                WatchEventKind::Deleted => {
                    crate::debug_event!(compiler.name(), "deleted", "{}", event.path.display());
                    match compiler.delete(&event.path).await {
                        Ok(DeleteOutcome::Removed(output)) => {
                            self.broadcaster.send(WatchNotice::Deleted { output });
                        }
                        Ok(DeleteOutcome::Absent | DeleteOutcome::Unmapped) => {}
                        Err(failure) => self.report_failure(compiler.name(), failure),
                    }
                }
            }
        }
    }

    fn report_failure(&self, compiler: &str, failure: CompileFailure) {
        tracing::error!("[{compiler}] {failure}");
        self.broadcaster.send(WatchNotice::Failed {
            file: failure.file,
            message: failure.message,
        });
    }
}

/// Builder for constructing a [`Watcher`].
pub struct WatcherBuilder {
    compilers: Vec<Arc<dyn AssetCompiler>>,
    roots: Vec<PathBuf>,
    broadcaster: Option<NoticeBroadcaster>,
    channel_capacity: usize,
}

impl WatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            compilers: Vec::new(),
            roots: Vec::new(),
            broadcaster: None,
            channel_capacity: 100,
        }
    }

    /// Add a compiler.
    pub fn compiler(mut self, compiler: impl AssetCompiler + 'static) -> Self {
        self.compilers.push(Arc::new(compiler));
        self
    }

    /// Add an already shared compiler.
    pub fn shared_compiler(mut self, compiler: Arc<dyn AssetCompiler>) -> Self {
        self.compilers.push(compiler);
        self
    }

    /// Set the directories to watch recursively.
    pub fn roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// Set the notice broadcaster.
    pub fn broadcaster(mut self, broadcaster: NoticeBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Set the raw event channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Build a watcher backed by the platform's recommended notify watcher.
    ///
    /// Every root is registered here, so changes made before [`Watcher::run`]
    /// starts are queued in the event channel rather than lost.
    pub fn build(self) -> Result<Watcher, WatchError> {
        if self.compilers.is_empty() {
            return Err(WatchError::InitFailed {
                reason: "At least one compiler is required".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(self.channel_capacity);

        // Runs on notify's own thread, so a blocking send is fine and keeps
        // the backend paced by the watch loop.
        let mut backend = notify::recommended_watcher(move |res: RawEvent| {
            let _ = tx.blocking_send(res);
        })?;

        for root in &self.roots {
            backend
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| WatchError::PathWatchFailed {
                    path: root.clone(),
                    reason: e.to_string(),
                })?;
            crate::debug_event!("watcher", "watching", "{}", root.display());
        }

        Ok(self.assemble(rx, Some(backend)))
    }

    /// Build a watcher fed through the returned sender instead of a backend.
    ///
    /// Lets another watch backend (for example a debouncing one) supply raw
    /// events. The watcher stops when every sender is dropped.
    pub fn build_detached(self) -> (Watcher, mpsc::Sender<RawEvent>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        (self.assemble(rx, None), tx)
    }

    fn assemble(
        self,
        event_rx: mpsc::Receiver<RawEvent>,
        backend: Option<notify::RecommendedWatcher>,
    ) -> Watcher {
        let (state, _) = watch::channel(WatcherState::Stopped);

        Watcher {
            compilers: self.compilers,
            roots: self.roots,
            event_rx,
            backend,
            broadcaster: self.broadcaster.unwrap_or_default(),
            state,
            cancel: CancellationToken::new(),
        }
    }
}

impl Default for WatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use notify::EventKind;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use parking_lot::Mutex;
    use tokio::time::timeout;

    use crate::mapping::CompileUnit;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Compile(PathBuf),
        Delete(PathBuf),
    }

    /// Records calls; fails compiles of files whose name contains "broken".
    #[derive(Default)]
    struct RecordingCompiler {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    #[async_trait]
    impl AssetCompiler for RecordingCompiler {
        fn name(&self) -> &str {
            "recording"
        }

        fn accept(&self, path: &Path) -> bool {
            path.extension().map(|e| e == "coffee").unwrap_or(false)
        }

        async fn compile(&self, path: &Path) -> Result<CompileOutcome, CompileFailure> {
            // Yield so a concurrent dispatcher would get a chance to interleave
            tokio::task::yield_now().await;
            self.calls.lock().push(Call::Compile(path.to_path_buf()));

            if path.to_string_lossy().contains("broken") {
                return Err(CompileFailure::for_path(path, "SyntaxError line 4"));
            }

            Ok(CompileOutcome::Compiled(CompileUnit {
                input: path.to_path_buf(),
                output: path.with_extension("js"),
                output_dir: path.parent().unwrap().to_path_buf(),
            }))
        }

        async fn delete(&self, path: &Path) -> Result<DeleteOutcome, CompileFailure> {
            self.calls.lock().push(Call::Delete(path.to_path_buf()));
            Ok(DeleteOutcome::Removed(path.with_extension("js")))
        }
    }

    fn raw(kind: EventKind, path: &str) -> RawEvent {
        Ok(Event::new(kind).add_path(PathBuf::from(path)))
    }

    fn created(path: &str) -> RawEvent {
        raw(EventKind::Create(CreateKind::File), path)
    }

    fn updated(path: &str) -> RawEvent {
        raw(EventKind::Modify(ModifyKind::Data(DataChange::Content)), path)
    }

    fn removed(path: &str) -> RawEvent {
        raw(EventKind::Remove(RemoveKind::File), path)
    }

    fn detached() -> (Watcher, mpsc::Sender<RawEvent>, Arc<Mutex<Vec<Call>>>) {
        detached_with(NoticeBroadcaster::default())
    }

    fn detached_with(
        broadcaster: NoticeBroadcaster,
    ) -> (Watcher, mpsc::Sender<RawEvent>, Arc<Mutex<Vec<Call>>>) {
        let compiler = RecordingCompiler::default();
        let calls = compiler.calls.clone();
        let (watcher, tx) = Watcher::builder()
            .compiler(compiler)
            .broadcaster(broadcaster)
            .build_detached();
        (watcher, tx, calls)
    }

    #[tokio::test]
    async fn test_events_for_one_path_are_handled_in_order() {
        let (watcher, tx, calls) = detached();
        let task = tokio::spawn(watcher.run());

        tx.send(created("/src/app.coffee")).await.unwrap();
        tx.send(updated("/src/app.coffee")).await.unwrap();
        tx.send(removed("/src/app.coffee")).await.unwrap();
        tx.send(created("/src/app.coffee")).await.unwrap();
        drop(tx);

        task.await.unwrap().unwrap();

        let app = PathBuf::from("/src/app.coffee");
        assert_eq!(
            *calls.lock(),
            vec![
                Call::Compile(app.clone()),
                Call::Compile(app.clone()),
                Call::Delete(app.clone()),
                Call::Compile(app),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_matching_extension_is_dropped() {
        let (watcher, tx, calls) = detached();
        let task = tokio::spawn(watcher.run());

        tx.send(created("/src/app.js")).await.unwrap();
        tx.send(updated("/src/README")).await.unwrap();
        tx.send(removed("/src/style.less")).await.unwrap();
        drop(tx);

        task.await.unwrap().unwrap();
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_compile_failure_keeps_watching() {
        let broadcaster = NoticeBroadcaster::new(16);
        let mut notices = broadcaster.subscribe();
        let (watcher, tx, calls) = detached_with(broadcaster);
        let handle = watcher.handle();
        let task = tokio::spawn(watcher.run());

        assert!(matches!(
            notices.recv().await.unwrap(),
            WatchNotice::Started { .. }
        ));

        tx.send(updated("/src/ui/broken.coffee")).await.unwrap();
        let failed = notices.recv().await.unwrap();
        assert_eq!(
            failed,
            WatchNotice::Failed {
                file: "broken.coffee".to_string(),
                message: "SyntaxError line 4".to_string(),
            }
        );
        assert_eq!(handle.state(), WatcherState::Watching);

        tx.send(updated("/src/ui/fine.coffee")).await.unwrap();
        assert!(matches!(
            notices.recv().await.unwrap(),
            WatchNotice::Compiled { .. }
        ));

        drop(tx);
        task.await.unwrap().unwrap();
        assert_eq!(calls.lock().len(), 2);
        assert_eq!(handle.state(), WatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_backend_failure_is_fatal() {
        let (watcher, tx, calls) = detached();
        let handle = watcher.handle();
        let task = tokio::spawn(watcher.run());

        tx.send(Err(notify::Error::generic("inotify watch limit reached")))
            .await
            .unwrap();
        // Queued behind the failure; never handled
        let _ = tx.send(created("/src/app.coffee")).await;

        let result = task.await.unwrap();
        assert!(matches!(result, Err(WatchError::Backend { .. })));
        assert_eq!(handle.state(), WatcherState::Stopped);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stop_transitions_to_stopped() {
        let (watcher, _tx, _calls) = detached();
        let mut handle = watcher.handle();
        assert_eq!(handle.state(), WatcherState::Stopped);

        let task = tokio::spawn(watcher.run());
        timeout(Duration::from_secs(5), handle.wait_for(WatcherState::Watching))
            .await
            .unwrap()
            .unwrap();

        handle.stop();
        task.await.unwrap().unwrap();
        assert_eq!(handle.state(), WatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_wait_for_fails_when_watcher_is_dropped() {
        let (watcher, _tx, _calls) = detached();
        let mut handle = watcher.handle();
        drop(watcher);

        let result = handle.wait_for(WatcherState::Watching).await;
        assert!(matches!(result, Err(WatchError::Closed)));
        // The state it was left in still counts as reached
        assert!(handle.wait_for(WatcherState::Stopped).await.is_ok());
    }

    #[test]
    fn test_build_fails_for_missing_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("absent");

        let result = Watcher::builder()
            .compiler(RecordingCompiler::default())
            .roots(vec![missing.clone()])
            .build();
        assert!(matches!(result, Err(WatchError::PathWatchFailed { path, .. }) if path == missing));
    }

    #[tokio::test]
    async fn test_changes_before_run_are_queued() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();

        let broadcaster = NoticeBroadcaster::new(64);
        let mut notices = broadcaster.subscribe();
        let watcher = Watcher::builder()
            .compiler(RecordingCompiler::default())
            .roots(vec![root.clone()])
            .broadcaster(broadcaster)
            .build()
            .unwrap();

        // Written while the loop is not running yet
        let source = root.join("early.coffee");
        std::fs::write(&source, "x = 1\n").unwrap();

        let handle = watcher.handle();
        let task = tokio::spawn(watcher.run());

        let compiled = timeout(Duration::from_secs(10), async {
            loop {
                if let WatchNotice::Compiled { input, .. } = notices.recv().await.unwrap() {
                    break input;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(compiled, source);

        handle.stop();
        task.await.unwrap().unwrap();
    }

    #[test]
    fn test_build_requires_a_compiler() {
        let result = Watcher::builder().build();
        assert!(matches!(result, Err(WatchError::InitFailed { .. })));
    }
}
