//! Event sources.
//!
//! A source turns an external tool into `Event`s for a date range and can
//! report when the files behind it change. The remind and task adapters
//! talk to their binaries; the composite federates any number of sources.

pub mod composite;
pub mod process;
pub mod remind;
pub mod task;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::date_range::DateRange;
use crate::error::UrdResult;
use crate::event::Event;
use crate::watcher::FileWatcher;

pub use composite::CompositeSource;
pub use remind::RemindSource;
pub use task::TaskSource;

/// Capacity of every change channel; sends past it are dropped.
pub const WATCH_CHANNEL_CAPACITY: usize = 10;

/// Boxed future returned by source operations.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = UrdResult<T>> + Send + 'a>>;

/// A watched file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChange {
    pub source: String,
    pub path: PathBuf,
}

pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    /// Events whose civil date lies in `range`, in source order.
    fn get_events(&self, range: DateRange) -> SourceFuture<'_, Vec<Event>>;

    /// Check that the backing tool can be run.
    fn test_connection(&self) -> SourceFuture<'_, ()>;

    /// Start watching the files behind this source.
    ///
    /// The returned channel closes when watching stops.
    fn watch_files(&self) -> UrdResult<mpsc::Receiver<SourceChange>>;

    fn stop_watching(&self);
}

impl<T: EventSource + ?Sized> EventSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get_events(&self, range: DateRange) -> SourceFuture<'_, Vec<Event>> {
        (**self).get_events(range)
    }

    fn test_connection(&self) -> SourceFuture<'_, ()> {
        (**self).test_connection()
    }

    fn watch_files(&self) -> UrdResult<mpsc::Receiver<SourceChange>> {
        (**self).watch_files()
    }

    fn stop_watching(&self) {
        (**self).stop_watching()
    }
}

/// File watch owned by an adapter, replaced on every `watch_files` call.
#[derive(Default)]
pub(crate) struct WatchSlot(Mutex<Option<FileWatcher>>);

impl WatchSlot {
    /// Watch `paths`, forwarding changes into a bounded channel without blocking.
    pub(crate) fn start(
        &self,
        source: &str,
        paths: &[&Path],
    ) -> UrdResult<mpsc::Receiver<SourceChange>> {
        self.stop();

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        if paths.is_empty() {
            return Ok(rx);
        }

        let name = source.to_string();
        let mut watcher = FileWatcher::new(move |path| {
            let change = SourceChange {
                source: name.clone(),
                path,
            };
            if tx.try_send(change).is_err() {
                debug!(source = %name, "change channel full, dropping notification");
            }
        })?;
        for path in paths {
            watcher.add(path)?;
        }

        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(watcher);
        }
        Ok(rx)
    }

    pub(crate) fn stop(&self) {
        let watcher = self.0.lock().ok().and_then(|mut slot| slot.take());
        if let Some(watcher) = watcher {
            watcher.close();
        }
    }
}
