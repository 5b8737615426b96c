//! Several sources behind one `EventSource`.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{EventSource, SourceChange, SourceFuture, WATCH_CHANNEL_CAPACITY};
use crate::date_range::DateRange;
use crate::error::{UrdError, UrdResult};
use crate::event::Event;

pub struct CompositeSource {
    sources: Vec<Box<dyn EventSource>>,
    forwarders: Mutex<Option<CancellationToken>>,
}

impl CompositeSource {
    pub fn new(sources: Vec<Box<dyn EventSource>>) -> Self {
        CompositeSource {
            sources,
            forwarders: Mutex::new(None),
        }
    }

    pub fn sources(&self) -> &[Box<dyn EventSource>] {
        &self.sources
    }

    /// Union of every source keyed by id; sources that fail are skipped.
    ///
    /// The first source to produce an id wins. The result is unordered.
    async fn load(&self, range: DateRange) -> UrdResult<Vec<Event>> {
        let mut by_id: HashMap<String, Event> = HashMap::new();

        for source in &self.sources {
            match source.get_events(range).await {
                Ok(events) => {
                    debug!(source = source.name(), count = events.len(), "source loaded");
                    for event in events {
                        by_id.entry(event.id.clone()).or_insert(event);
                    }
                }
                Err(e) => warn!(source = source.name(), error = %e, "source failed, skipping"),
            }
        }

        Ok(by_id.into_values().collect())
    }

    fn cancel_forwarders(&self) {
        let token = self.forwarders.lock().ok().and_then(|mut slot| slot.take());
        if let Some(token) = token {
            token.cancel();
        }
    }
}

impl EventSource for CompositeSource {
    fn name(&self) -> &str {
        "composite"
    }

    fn get_events(&self, range: DateRange) -> SourceFuture<'_, Vec<Event>> {
        Box::pin(self.load(range))
    }

    /// Succeeds when at least one source is reachable.
    fn test_connection(&self) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let mut failures = Vec::new();
            for source in &self.sources {
                match source.test_connection().await {
                    Ok(()) => return Ok(()),
                    Err(e) => failures.push(format!("{}: {}", source.name(), e)),
                }
            }
            Err(UrdError::CommandFailure(if failures.is_empty() {
                "no sources configured".to_string()
            } else {
                failures.join("; ")
            }))
        })
    }

    fn watch_files(&self) -> UrdResult<mpsc::Receiver<SourceChange>> {
        self.stop_watching();

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let token = CancellationToken::new();

        for source in &self.sources {
            let mut inner = match source.watch_files() {
                Ok(inner) => inner,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "could not watch source files");
                    continue;
                }
            };

            let tx = tx.clone();
            let cancel = token.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        change = inner.recv() => match change {
                            Some(change) => {
                                if tx.try_send(change).is_err() {
                                    debug!("composite change channel full, dropping notification");
                                }
                            }
                            None => break,
                        },
                    }
                }
            });
        }

        if let Ok(mut slot) = self.forwarders.lock() {
            *slot = Some(token);
        }
        // Forwarders hold the only senders, so the output closes once they all exit.
        drop(tx);
        Ok(rx)
    }

    fn stop_watching(&self) {
        self.cancel_forwarders();
        for source in &self.sources {
            source.stop_watching();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticSource {
        name: &'static str,
        events: Option<Vec<Event>>,
        changes: Mutex<Option<mpsc::Sender<SourceChange>>>,
        stops: Arc<AtomicUsize>,
    }

    impl StaticSource {
        fn new(name: &'static str, events: Option<Vec<Event>>) -> Self {
            StaticSource {
                name,
                events,
                changes: Mutex::new(None),
                stops: Arc::default(),
            }
        }

        fn emit(&self, path: &str) {
            if let Some(tx) = self.changes.lock().unwrap().as_ref() {
                tx.try_send(SourceChange {
                    source: self.name.to_string(),
                    path: PathBuf::from(path),
                })
                .unwrap();
            }
        }
    }

    impl EventSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        fn get_events(&self, _range: DateRange) -> SourceFuture<'_, Vec<Event>> {
            let result = self
                .events
                .clone()
                .ok_or_else(|| UrdError::CommandFailure(format!("{} is down", self.name)));
            Box::pin(async move { result })
        }

        fn test_connection(&self) -> SourceFuture<'_, ()> {
            let ok = self.events.is_some();
            Box::pin(async move {
                if ok {
                    Ok(())
                } else {
                    Err(UrdError::CommandFailure("down".into()))
                }
            })
        }

        fn watch_files(&self) -> UrdResult<mpsc::Receiver<SourceChange>> {
            let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
            *self.changes.lock().unwrap() = Some(tx);
            Ok(rx)
        }

        fn stop_watching(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.changes.lock().unwrap().take();
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 19).unwrap()
    }

    fn range() -> DateRange {
        DateRange::days_from(day(), 7)
    }

    #[tokio::test]
    async fn failing_source_is_skipped_and_ids_deduplicated() {
        let a = StaticSource::new(
            "a",
            Some(vec![
                Event::untimed("x", day(), "from a"),
                Event::untimed("y", day(), "only a"),
            ]),
        );
        let b = StaticSource::new("b", None);
        let c = StaticSource::new(
            "c",
            Some(vec![
                Event::untimed("x", day(), "from c"),
                Event::untimed("z", day(), "only c"),
            ]),
        );
        let composite = CompositeSource::new(vec![Box::new(a), Box::new(b), Box::new(c)]);

        let mut events = composite.get_events(range()).await.unwrap();
        events.sort_by(|l, r| l.id.cmp(&r.id));
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert_eq!(events[0].description, "from a");
    }

    #[tokio::test]
    async fn all_sources_failing_yields_empty() {
        let composite = CompositeSource::new(vec![Box::new(StaticSource::new("b", None))]);
        assert!(composite.get_events(range()).await.unwrap().is_empty());
        assert!(composite.test_connection().await.is_err());
    }

    #[tokio::test]
    async fn changes_are_forwarded_and_closed_on_stop() {
        let a = Arc::new(StaticSource::new("a", Some(vec![])));
        let stops = a.stops.clone();

        let composite = CompositeSource::new(vec![Box::new(a.clone())]);
        let mut rx = composite.watch_files().unwrap();

        a.emit("/tmp/a.rem");
        let change = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.source, "a");
        assert_eq!(change.path, PathBuf::from("/tmp/a.rem"));

        composite.stop_watching();
        let closed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(closed.is_none());
        // Once from the initial watch_files reset, once from stop_watching.
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }
}
