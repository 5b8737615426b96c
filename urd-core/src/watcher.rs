//! Debounced file watching.
//!
//! The OS watcher thread forwards raw events to a tokio task that keeps one
//! deadline per path. A path fires `on_change` once no new event has touched
//! it for [`DEBOUNCE`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{UrdError, UrdResult};

pub const DEBOUNCE: Duration = Duration::from_millis(100);

type WatchedPaths = Arc<Mutex<HashSet<PathBuf>>>;

/// Watches individual files and reports coalesced changes.
///
/// Must be created inside a tokio runtime.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    watched: WatchedPaths,
    directories: HashSet<PathBuf>,
    shutdown: CancellationToken,
}

impl FileWatcher {
    pub fn new<F>(on_change: F) -> UrdResult<Self>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = raw_tx.send(res);
        })?;

        let watched: WatchedPaths = Arc::default();
        let shutdown = CancellationToken::new();
        tokio::spawn(debounce_loop(
            raw_rx,
            watched.clone(),
            on_change,
            shutdown.clone(),
        ));

        Ok(FileWatcher {
            watcher,
            watched,
            directories: HashSet::new(),
            shutdown,
        })
    }

    /// Start watching `path`; returns the absolute path that will be reported.
    ///
    /// The parent directory is watched so files that are replaced or created
    /// later are still seen.
    pub fn add(&mut self, path: &Path) -> UrdResult<PathBuf> {
        let absolute = std::path::absolute(path)?;
        let parent = absolute
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| UrdError::Watch(format!("{} has no parent", absolute.display())))?;

        if self.directories.insert(parent.clone()) {
            self.watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        }

        let mut watched = self
            .watched
            .lock()
            .map_err(|_| UrdError::Watch("watch list poisoned".into()))?;
        watched.insert(absolute.clone());
        if let Ok(canonical) = absolute.canonicalize() {
            watched.insert(canonical);
        }
        if let Ok(parent) = parent.canonicalize() {
            if let Some(name) = absolute.file_name() {
                watched.insert(parent.join(name));
            }
        }

        debug!(path = %absolute.display(), "watching");
        Ok(absolute)
    }

    /// Stop the debounce task and every OS watch.
    pub fn close(mut self) {
        self.shutdown.cancel();
        for dir in self.directories.drain() {
            let _ = self.watcher.unwatch(&dir);
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn watched_only(watched: &WatchedPaths, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    match watched.lock() {
        Ok(watched) => paths.into_iter().filter(|p| watched.contains(p)).collect(),
        Err(_) => Vec::new(),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn debounce_loop<F>(
    mut raw: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    watched: WatchedPaths,
    on_change: F,
    shutdown: CancellationToken,
) where
    F: Fn(PathBuf) + Send + 'static,
{
    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();

    loop {
        let next = pending.values().min().copied();
        tokio::select! {
            _ = shutdown.cancelled() => break,
            msg = raw.recv() => match msg {
                Some(Ok(event)) if is_change(&event.kind) => {
                    for path in watched_only(&watched, event.paths) {
                        pending.insert(path, Instant::now() + DEBOUNCE);
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => warn!(error = %err, "file watcher error"),
                None => break,
            },
            _ = sleep_until(next) => {
                let now = Instant::now();
                let mut due: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, deadline)| **deadline <= now)
                    .map(|(path, _)| path.clone())
                    .collect();
                due.sort();
                for path in due {
                    pending.remove(&path);
                    debug!(path = %path.display(), "file changed");
                    on_change(path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn burst_of_writes_fires_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("reminders.rem");
        std::fs::write(&file, "REM Mon MSG hi\n").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = FileWatcher::new(move |path| {
            let _ = tx.send(path);
        })
        .unwrap();
        watcher.add(&file).unwrap();

        for i in 0..5 {
            std::fs::write(&file, format!("REM Mon MSG hi {i}\n")).unwrap();
        }

        let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert!(first.unwrap().ends_with("reminders.rem"));
        let second = timeout(Duration::from_millis(400), rx.recv()).await;
        assert!(second.is_err(), "burst should coalesce into one notification");

        watcher.close();
    }

    #[tokio::test]
    async fn unwatched_siblings_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("watched.rem");
        std::fs::write(&file, "").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = FileWatcher::new(move |path| {
            let _ = tx.send(path);
        })
        .unwrap();
        watcher.add(&file).unwrap();

        std::fs::write(dir.path().join("other.txt"), "noise").unwrap();
        assert!(timeout(Duration::from_millis(400), rx.recv()).await.is_err());

        std::fs::write(dir.path().join("created-later.rem"), "").unwrap();
        std::fs::write(&file, "REM MSG changed\n").unwrap();
        let path = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert!(path.ends_with("watched.rem"));
    }
}
