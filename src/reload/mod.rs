//! Hot reload of mapping documents.
//!
//! The watcher runs two tokio tasks:
//!
//! - a **poller** that snapshots the `*.xml` files in the watched directories
//!   every `poll_interval_ms` and sends the differences on a channel;
//! - a single **consumer** that debounces change batches, rebuilds the document
//!   set through a [`DocumentSource`] and publishes the result with
//!   [`LiveRegistry::replace`].
//!
//! Rebuilds are serialized by construction. A failed rebuild is logged and the
//! registry keeps its current state. The watched directories are recomputed
//! after every successful rebuild.
//!
//! ```text
//! Idle ──start──▶ Watching ──changes──▶ Rebuilding ──▶ Watching
//!                    │
//!                    └──stop / fatal watch error──▶ Stopped
//! ```

mod snapshot;

pub use snapshot::{ChangeKind, FileChange, Snapshot, compute_checksum};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::HotReloadConfig;
use crate::core::Result;
use crate::document::DocumentSet;
use crate::registry::LiveRegistry;

/// Something that can rebuild the complete document set from disk.
pub trait DocumentSource: Send + Sync + 'static {
    fn rebuild(&self) -> Result<DocumentSet>;
}

/// Lifecycle of a [`HotReloadWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WatcherState {
    Idle = 0,
    Watching = 1,
    Rebuilding = 2,
    Stopped = 3,
}

impl WatcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Watching,
            2 => Self::Rebuilding,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Watching => "watching",
            Self::Rebuilding => "rebuilding",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct StateCell(AtomicU8);

impl StateCell {
    fn get(&self) -> WatcherState {
        WatcherState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WatcherState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move to `state` unless the watcher already stopped.
    fn advance(&self, state: WatcherState) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            (current != WatcherState::Stopped as u8).then_some(state as u8)
        });
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    poller: JoinHandle<()>,
    consumer: JoinHandle<()>,
}

/// Background watcher keeping a [`LiveRegistry`] in sync with fragment files.
pub struct HotReloadWatcher {
    registry: Arc<LiveRegistry>,
    source: Arc<dyn DocumentSource>,
    settings: HotReloadConfig,
    state: Arc<StateCell>,
    running: Option<Running>,
}

impl HotReloadWatcher {
    pub fn new(registry: Arc<LiveRegistry>, source: Arc<dyn DocumentSource>, settings: HotReloadConfig) -> Self {
        Self {
            registry,
            source,
            settings,
            state: Arc::new(StateCell::default()),
            running: None,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state.get()
    }

    /// Start watching the files `initial` was built from.
    ///
    /// Does nothing unless hot reload is enabled. Must be called inside a tokio
    /// runtime.
    pub fn start(&mut self, initial: &DocumentSet) {
        if !self.settings.enabled {
            tracing::debug!("Hot reload disabled");
            return;
        }
        if self.running.is_some() {
            return;
        }

        let dirs = initial.watch_dirs();
        tracing::info!("Watching {} mapper directories for changes", dirs.len());

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (dirs_tx, dirs_rx) = watch::channel(dirs);
        let (change_tx, change_rx) = mpsc::channel(16);
        self.state.set(WatcherState::Watching);

        let poller = tokio::spawn(poll_loop(
            self.settings.poll_interval(),
            dirs_rx,
            change_tx,
            shutdown_rx.clone(),
            Arc::clone(&self.state),
        ));
        let consumer = tokio::spawn(
            Consumer {
                registry: Arc::clone(&self.registry),
                source: Arc::clone(&self.source),
                debounce: self.settings.debounce(),
                previous: initial.namespaces(),
                dirs_tx,
                state: Arc::clone(&self.state),
            }
            .run(change_rx, shutdown_rx),
        );

        self.running = Some(Running {
            shutdown,
            poller,
            consumer,
        });
    }

    /// Request a stop and wait for both tasks to finish. A rebuild in progress
    /// completes first.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(true);
        for (name, handle) in [("poller", running.poller), ("consumer", running.consumer)] {
            if let Err(e) = handle.await {
                tracing::warn!("Hot reload {name} task ended abnormally: {e}");
            }
        }
        self.state.set(WatcherState::Stopped);
        tracing::info!("Hot reload stopped");
    }
}

impl Drop for HotReloadWatcher {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
        }
    }
}

async fn poll_loop(
    interval: Duration,
    mut dirs: watch::Receiver<Vec<PathBuf>>,
    changes: mpsc::Sender<Vec<FileChange>>,
    mut shutdown: watch::Receiver<bool>,
    state: Arc<StateCell>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let watched = dirs.borrow_and_update().clone();
    let mut last = match Snapshot::scan(&watched, &Snapshot::default()) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!("Hot reload cannot start: {e}");
            state.set(WatcherState::Stopped);
            return;
        }
    };

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let watched = dirs.borrow_and_update().clone();
                let next = match Snapshot::scan(&watched, &last) {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::error!("Stopping hot reload: {e}");
                        state.set(WatcherState::Stopped);
                        break;
                    }
                };
                let diff = last.diff(&next);
                last = next;
                if diff.is_empty() {
                    continue;
                }
                tracing::debug!("Detected {} mapper file changes", diff.len());
                if changes.send(diff).await.is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

struct Consumer {
    registry: Arc<LiveRegistry>,
    source: Arc<dyn DocumentSource>,
    debounce: Duration,
    /// Namespaces of the last successful build.
    previous: Vec<String>,
    dirs_tx: watch::Sender<Vec<PathBuf>>,
    state: Arc<StateCell>,
}

impl Consumer {
    async fn run(mut self, mut changes: mpsc::Receiver<Vec<FileChange>>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let mut batch = tokio::select! {
                received = changes.recv() => match received {
                    Some(batch) => batch,
                    None => break,
                },
                _ = shutdown.changed() => break,
            };

            // collect until the files have been quiet for one debounce window
            while let Ok(Some(more)) = tokio::time::timeout(self.debounce, changes.recv()).await {
                batch.extend(more);
            }
            for change in &batch {
                tracing::debug!("{:?} {}", change.kind, change.path.display());
            }

            self.state.advance(WatcherState::Rebuilding);
            self.rebuild().await;
            self.state.advance(WatcherState::Watching);
        }
    }

    async fn rebuild(&mut self) {
        let registry = Arc::clone(&self.registry);
        let source = Arc::clone(&self.source);
        let previous = self.previous.clone();

        let outcome = tokio::task::spawn_blocking(move || -> Result<(u64, DocumentSet)> {
            let set = source.rebuild()?;
            let version = registry.replace(&previous, &set)?;
            Ok((version, set))
        })
        .await;

        match outcome {
            Ok(Ok((version, set))) => {
                self.previous = set.namespaces();
                let _ = self.dirs_tx.send(set.watch_dirs());
                tracing::info!("Reloaded {} mapper documents (registry version {version})", set.documents.len());
            }
            Ok(Err(e)) => {
                tracing::error!(
                    "Reload failed, keeping registry version {}: {e}",
                    self.registry.version()
                );
            }
            Err(e) => tracing::error!("Reload task panicked: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MapperError;
    use crate::document::{DocumentOrigin, FinalDocument};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Turns every `*.xml` file of one directory into a document.
    struct DirSource(PathBuf);

    impl DocumentSource for DirSource {
        fn rebuild(&self) -> Result<DocumentSet> {
            let mut documents = Vec::new();
            let mut paths = Vec::new();
            let mut entries: Vec<_> = fs::read_dir(&self.0)
                .map_err(|e| MapperError::io("read dir", &self.0, e))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|x| x == "xml"))
                .collect();
            entries.sort();
            for path in entries {
                let content = fs::read_to_string(&path).map_err(|e| MapperError::io("read", &path, e))?;
                documents.push(FinalDocument {
                    resource: path.file_name().unwrap().to_string_lossy().into_owned(),
                    namespace: "demo.OrderMapper".to_string(),
                    content,
                    origin: DocumentOrigin::Leftover,
                    source: Some(path.clone()),
                });
                paths.push(path);
            }
            Ok(DocumentSet {
                documents,
                fragment_paths: paths,
                ..DocumentSet::default()
            })
        }
    }

    fn settings() -> HotReloadConfig {
        HotReloadConfig {
            enabled: true,
            debounce_ms: 20,
            poll_interval_ms: 20,
        }
    }

    fn write_mapper(dir: &Path, statement: &str) {
        fs::write(
            dir.join("OrderMapper.xml"),
            format!("<mapper namespace=\"demo.OrderMapper\"><select id=\"{statement}\">SELECT 1</select></mapper>"),
        )
        .unwrap();
    }

    async fn wait_for(registry: &LiveRegistry, version: u64) -> bool {
        for _ in 0..200 {
            if registry.version() >= version {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_reload_swaps_statements() {
        let temp = TempDir::new().unwrap();
        write_mapper(temp.path(), "topOrders");

        let source = Arc::new(DirSource(temp.path().to_path_buf()));
        let initial = source.rebuild().unwrap();
        let registry = Arc::new(LiveRegistry::new());
        registry.install(&initial).unwrap();

        let mut watcher = HotReloadWatcher::new(Arc::clone(&registry), source, settings());
        assert_eq!(watcher.state(), WatcherState::Idle);
        watcher.start(&initial);
        assert_eq!(watcher.state(), WatcherState::Watching);

        // let the poller take its baseline
        tokio::time::sleep(Duration::from_millis(60)).await;
        write_mapper(temp.path(), "recentOrders");

        assert!(wait_for(&registry, 2).await, "registry was not reloaded");
        assert!(registry.statement("demo.OrderMapper.recentOrders").is_some());
        assert!(registry.statement("demo.OrderMapper.topOrders").is_none());

        watcher.stop().await;
        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_registry() {
        let temp = TempDir::new().unwrap();
        write_mapper(temp.path(), "topOrders");

        let source = Arc::new(DirSource(temp.path().to_path_buf()));
        let initial = source.rebuild().unwrap();
        let registry = Arc::new(LiveRegistry::new());
        registry.install(&initial).unwrap();

        let mut watcher = HotReloadWatcher::new(Arc::clone(&registry), source, settings());
        watcher.start(&initial);
        tokio::time::sleep(Duration::from_millis(60)).await;

        fs::write(temp.path().join("OrderMapper.xml"), "<mapper><select id=\"broken\"/></mapper>").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(registry.version(), 1);
        assert!(registry.statement("demo.OrderMapper.topOrders").is_some());
        assert_eq!(watcher.state(), WatcherState::Watching);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_disabled_watcher_is_inert() {
        let registry = Arc::new(LiveRegistry::new());
        let source = Arc::new(DirSource(PathBuf::from("/definitely/not/here")));
        let mut watcher = HotReloadWatcher::new(registry, source, HotReloadConfig::default());
        watcher.start(&DocumentSet::default());
        assert_eq!(watcher.state(), WatcherState::Idle);
        watcher.stop().await;
        assert_eq!(watcher.state(), WatcherState::Idle);
    }
}
