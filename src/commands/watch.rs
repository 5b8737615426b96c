//! Live schedule.
//!
//! Commands arrive one per line on stdin (see `Key::parse`). The loop also
//! wakes on source file changes, the refresh interval and every minute, feeds
//! each event to the controller, then performs the effects it asks for.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use urd_core::config::UrdConfig;
use urd_core::schedule::{Cursor, find_next_widening};
use urd_core::source::{EventSource, SourceChange};

use super::Sources;
use crate::app::{App, Effect, Key, Msg};
use crate::utils::editor;

enum Outcome {
    Msg(Msg),
    Quit,
}

pub async fn run(config: &UrdConfig, rows: u16, width: u16) -> Result<()> {
    let sources = Sources::from_config(config);
    let now = super::now();
    let viewport = super::viewport(config, rows, width);
    let increment = config.increment();
    let cursor = Cursor::at(now, increment, viewport.visible_slots(increment));
    let mut app = App::new(cursor, viewport, now, config.idle_advance_minutes);

    let mut changes = match sources.all.watch_files() {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!(error = %e, "file watching unavailable, relying on refresh");
            None
        }
    };
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut refresh = tokio::time::interval(Duration::from_secs(config.refresh_interval_secs.max(1)));
    let mut minute = tokio::time::interval(Duration::from_secs(60));
    // Both intervals fire immediately; the initial load covers that.
    refresh.tick().await;
    minute.tick().await;

    let mut queue: VecDeque<Effect> = VecDeque::from([Effect::Load(app.wanted_range())]);

    loop {
        while let Some(effect) = queue.pop_front() {
            match perform(effect, &app, &sources, config).await {
                Outcome::Msg(msg) => queue.extend(app.update(msg)),
                Outcome::Quit => {
                    sources.all.stop_watching();
                    return Ok(());
                }
            }
        }
        draw(&app);

        let msg = tokio::select! {
            line = input.next_line() => match line? {
                Some(line) => match Key::parse(&line) {
                    Some(key) => Msg::Key(key, super::now()),
                    None => {
                        eprintln!("{}", format!("Unknown command '{}'", line.trim()).red());
                        continue;
                    }
                },
                // stdin closed
                None => Msg::Key(Key::Quit, super::now()),
            },
            Some(change) = next_change(&mut changes) => Msg::FilesChanged(change),
            _ = refresh.tick() => Msg::Tick,
            _ = minute.tick() => Msg::MinuteTick(super::now()),
        };
        queue.extend(app.update(msg));
    }
}

/// Next file change; pends forever when nothing is being watched.
async fn next_change(changes: &mut Option<mpsc::Receiver<SourceChange>>) -> Option<SourceChange> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn perform(effect: Effect, app: &App, sources: &Sources, config: &UrdConfig) -> Outcome {
    match effect {
        Effect::Load(range) => {
            let events = sources.all.get_events(range).await;
            Outcome::Msg(Msg::EventsLoaded(range, events))
        }
        Effect::Search { term, loaded } => {
            let found = find_next_widening(&sources.all, app.events(), loaded, &app.cursor, &term).await;
            Outcome::Msg(Msg::SearchFinished(found))
        }
        Effect::Append(event) => {
            let written = sources
                .remind
                .add_event_struct(&event)
                .map(|(path, line)| format!("Added {} at {}:{}", event.description, path.display(), line));
            Outcome::Msg(Msg::Written(written))
        }
        Effect::Remove(event) => {
            let written = sources
                .remind
                .remove_event(&event)
                .map(|()| format!("Removed {}", event.description));
            Outcome::Msg(Msg::Written(written))
        }
        Effect::Edit { file, line } => {
            let file = match file {
                Some(file) => file,
                None => match sources.remind.primary_file() {
                    Ok(file) => file.to_path_buf(),
                    Err(e) => return Outcome::Msg(Msg::EditorFinished(Err(e))),
                },
            };
            info!(file = %file.display(), ?line, "handing off to the editor");
            let result = editor::launch(&config.editor, &file, line).await;
            Outcome::Msg(Msg::EditorFinished(result))
        }
        Effect::Quit => Outcome::Quit,
    }
}

fn draw(app: &App) {
    println!();
    for line in super::screen(app, super::now()) {
        println!("{line}");
    }
    println!("{}", "[j/k] move  [h/l] day  [/term] search  [y/d/p] copy/cut/paste  [e] edit  [q] quit".dimmed());
}
