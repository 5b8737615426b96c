//! Message-driven controller for the live schedule.
//!
//! `App` owns the cursor, the loaded events and the status line. Everything
//! that touches the outside world (loading, writing, the editor) is returned
//! as an [`Effect`] for the driver to perform; its outcome comes back as a
//! [`Msg`].

use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use urd_core::date_range::DateRange;
use urd_core::schedule::{self, Cursor, Focus, Found, Schedule, Viewport};
use urd_core::source::SourceChange;
use urd_core::{Event, EventType, UrdError, UrdResult};

/// Days loaded on either side of the visible window.
const LOAD_MARGIN_DAYS: i64 = 7;

/// A user command, decoupled from how keys are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    NextDay,
    PrevDay,
    NextWeek,
    PrevWeek,
    NextMonth,
    PrevMonth,
    ZoomIn,
    ZoomOut,
    Today,
    Goto(NaiveDate),
    ToggleFocus,
    Search(String),
    SearchAgain,
    Copy,
    Cut,
    Paste,
    Edit,
    Refresh,
    Quit,
}

impl Key {
    /// Line-oriented bindings for terminals without raw key input.
    pub fn parse(input: &str) -> Option<Key> {
        let input = input.trim();
        if let Some(term) = input.strip_prefix('/') {
            let term = term.trim();
            return Some(if term.is_empty() {
                Key::SearchAgain
            } else {
                Key::Search(term.to_string())
            });
        }
        if let Some(date) = input.strip_prefix("g ") {
            return NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .ok()
                .map(Key::Goto);
        }
        Some(match input {
            "k" => Key::Up,
            "j" | "" => Key::Down,
            "l" => Key::NextDay,
            "h" => Key::PrevDay,
            "L" => Key::NextWeek,
            "H" => Key::PrevWeek,
            "}" => Key::NextMonth,
            "{" => Key::PrevMonth,
            "+" | "z" => Key::ZoomIn,
            "-" | "Z" => Key::ZoomOut,
            "t" => Key::Today,
            "f" => Key::ToggleFocus,
            "n" => Key::SearchAgain,
            "y" => Key::Copy,
            "d" => Key::Cut,
            "p" => Key::Paste,
            "e" => Key::Edit,
            "r" => Key::Refresh,
            "q" => Key::Quit,
            _ => return None,
        })
    }
}

#[derive(Debug)]
pub enum Msg {
    Key(Key, NaiveDateTime),
    Resize(Viewport),
    /// Periodic refresh.
    Tick,
    MinuteTick(NaiveDateTime),
    FilesChanged(SourceChange),
    EventsLoaded(DateRange, UrdResult<Vec<Event>>),
    SearchFinished(UrdResult<Option<Found>>),
    Written(UrdResult<String>),
    EditorFinished(UrdResult<()>),
}

/// Work the driver performs on behalf of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Load(DateRange),
    Search { term: String, loaded: DateRange },
    Append(Event),
    Remove(Event),
    Edit { file: Option<PathBuf>, line: Option<u32> },
    Quit,
}

/// Copied or cut event waiting to be pasted.
///
/// `cut` turns true only once the source confirms the removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    pub event: Event,
    pub cut: bool,
}

pub struct App {
    pub cursor: Cursor,
    pub viewport: Viewport,
    events: Vec<Event>,
    loaded: Option<DateRange>,
    status: Option<String>,
    clipboard: Option<Clipboard>,
    pending_cut: bool,
    last_search: Option<String>,
    last_input: NaiveDateTime,
    idle_threshold: Duration,
}

impl App {
    pub fn new(cursor: Cursor, viewport: Viewport, now: NaiveDateTime, idle_minutes: i64) -> Self {
        App {
            cursor,
            viewport,
            events: Vec::new(),
            loaded: None,
            status: None,
            clipboard: None,
            pending_cut: false,
            last_search: None,
            last_input: now,
            idle_threshold: Duration::minutes(idle_minutes),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    pub fn visible_slots(&self) -> i64 {
        self.viewport.visible_slots(self.cursor.increment)
    }

    pub fn layout(&self, now: NaiveDateTime) -> Schedule {
        schedule::layout(&self.cursor, &self.viewport, &self.events, now)
    }

    /// Untimed events of the selected day, in sidebar order.
    pub fn sidebar(&self) -> Vec<&Event> {
        schedule::untimed_for_day(&self.events, self.cursor.selected_date())
    }

    /// Dates covered by the viewport plus a margin on either side.
    pub fn wanted_range(&self) -> DateRange {
        let visible = self.visible_slots().max(1);
        let first = schedule::slot::slot_date(self.cursor.top_slot, self.cursor.reference_date, self.cursor.increment);
        let last = schedule::slot::slot_date(
            self.cursor.top_slot + visible - 1,
            self.cursor.reference_date,
            self.cursor.increment,
        );
        let selected = self.cursor.selected_date();
        DateRange::new(
            first.min(selected) - Duration::days(LOAD_MARGIN_DAYS),
            last.max(selected) + Duration::days(LOAD_MARGIN_DAYS),
        )
    }

    /// The event under the cursor, if any.
    pub fn selected_event(&self) -> Option<&Event> {
        match self.cursor.focus {
            Focus::Untimed => self.sidebar().get(self.cursor.untimed_index).copied(),
            Focus::Timed => {
                let date = self.cursor.selected_date();
                let time = self.cursor.selected_time();
                let at = date.and_time(time);
                let step = Duration::minutes(self.cursor.increment.minutes());
                let mut timed: Vec<&Event> = self
                    .events
                    .iter()
                    .filter(|e| {
                        let start = e.start();
                        let end = start + e.duration.unwrap_or(step).max(step);
                        e.is_timed() && start < at + step && at < end
                    })
                    .collect();
                timed.sort_by(|a, b| schedule::layout::compare_events(a, b));
                timed.first().copied()
            }
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Reload when the cursor left the loaded window.
    fn ensure_loaded(&self) -> Vec<Effect> {
        let wanted = self.wanted_range();
        match self.loaded {
            Some(loaded) if loaded.contains(wanted.start) && loaded.contains(wanted.end) => Vec::new(),
            _ => vec![Effect::Load(wanted)],
        }
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Key(key, now) => {
                self.last_input = now;
                self.on_key(key, now)
            }
            Msg::Resize(viewport) => {
                self.viewport = viewport;
                self.cursor.ensure_selected_slot_visible(self.visible_slots());
                self.ensure_loaded()
            }
            Msg::Tick => vec![Effect::Load(self.wanted_range())],
            Msg::MinuteTick(now) => {
                let idle = now - self.last_input;
                let visible = self.visible_slots();
                if self.cursor.auto_advance(now, idle, self.idle_threshold, visible) {
                    debug!(slot = self.cursor.selected_slot, "cursor followed the clock");
                    return self.ensure_loaded();
                }
                Vec::new()
            }
            Msg::FilesChanged(change) => {
                debug!(source = %change.source, path = %change.path.display(), "reloading after change");
                vec![Effect::Load(self.wanted_range())]
            }
            Msg::EventsLoaded(range, Ok(events)) => {
                self.events = events;
                self.loaded = Some(range);
                Vec::new()
            }
            Msg::EventsLoaded(_, Err(e)) => {
                self.set_status(describe(&e));
                Vec::new()
            }
            Msg::SearchFinished(Ok(Some(found))) => {
                let visible = self.visible_slots();
                schedule::apply_found(&mut self.cursor, &found, visible);
                self.set_status(format!("Found: {}", found.event.description));
                self.ensure_loaded()
            }
            Msg::SearchFinished(Ok(None)) => {
                let term = self.last_search.clone().unwrap_or_default();
                self.set_status(format!("No match for '{term}'"));
                Vec::new()
            }
            Msg::SearchFinished(Err(e)) | Msg::EditorFinished(Err(e)) => {
                self.set_status(describe(&e));
                Vec::new()
            }
            Msg::Written(Err(e)) => {
                if std::mem::take(&mut self.pending_cut) {
                    self.set_status(format!("{} (kept as a copy)", describe(&e)));
                } else {
                    self.set_status(describe(&e));
                }
                Vec::new()
            }
            Msg::Written(Ok(status)) => {
                if std::mem::take(&mut self.pending_cut) {
                    if let Some(clip) = self.clipboard.as_mut() {
                        clip.cut = true;
                    }
                }
                self.set_status(status);
                vec![Effect::Load(self.wanted_range())]
            }
            Msg::EditorFinished(Ok(())) => vec![Effect::Load(self.wanted_range())],
        }
    }

    fn on_key(&mut self, key: Key, now: NaiveDateTime) -> Vec<Effect> {
        let visible = self.visible_slots();
        self.status = None;

        match key {
            Key::Up => match self.cursor.focus {
                Focus::Timed => self.cursor.move_up(visible),
                Focus::Untimed => {
                    let count = self.sidebar().len();
                    self.cursor.move_untimed(-1, count);
                }
            },
            Key::Down => match self.cursor.focus {
                Focus::Timed => self.cursor.move_down(visible),
                Focus::Untimed => {
                    let count = self.sidebar().len();
                    self.cursor.move_untimed(1, count);
                }
            },
            Key::NextDay => self.cursor.next_day(),
            Key::PrevDay => self.cursor.prev_day(),
            Key::NextWeek => self.cursor.next_week(),
            Key::PrevWeek => self.cursor.prev_week(),
            Key::NextMonth => self.cursor.next_month(),
            Key::PrevMonth => self.cursor.prev_month(),
            Key::ZoomIn => {
                let increment = self.cursor.increment.zoom_in();
                let visible = self.viewport.visible_slots(increment);
                self.cursor.set_increment(increment, visible);
            }
            Key::ZoomOut => {
                let increment = self.cursor.increment.zoom_out();
                let visible = self.viewport.visible_slots(increment);
                self.cursor.set_increment(increment, visible);
            }
            Key::Today => self.cursor.goto_now(now, visible),
            Key::Goto(date) => self.cursor.goto_date(date),
            Key::ToggleFocus => {
                if self.cursor.focus == Focus::Timed && self.sidebar().is_empty() {
                    self.set_status("No untimed events on this day");
                } else {
                    self.cursor.toggle_focus();
                }
            }
            Key::Search(term) => {
                self.last_search = Some(term);
                return self.search();
            }
            Key::SearchAgain => return self.search(),
            Key::Copy | Key::Cut => return self.copy(matches!(key, Key::Cut)),
            Key::Paste => return self.paste(),
            Key::Edit => {
                let (file, line) = match self.selected_event() {
                    Some(event) => (event.source_file.clone().map(PathBuf::from), event.source_line),
                    None => (None, None),
                };
                return vec![Effect::Edit { file, line }];
            }
            Key::Refresh => return vec![Effect::Load(self.wanted_range())],
            Key::Quit => return vec![Effect::Quit],
        }

        self.cursor.ensure_selected_slot_visible(self.visible_slots());
        self.ensure_loaded()
    }

    fn search(&mut self) -> Vec<Effect> {
        let Some(term) = self.last_search.clone() else {
            self.set_status("No previous search");
            return Vec::new();
        };
        if let Some(found) = schedule::find_next(&self.events, &self.cursor, &term) {
            return self.update(Msg::SearchFinished(Ok(Some(found))));
        }
        vec![Effect::Search {
            term,
            loaded: self.loaded.unwrap_or_else(|| self.wanted_range()),
        }]
    }

    fn copy(&mut self, cut: bool) -> Vec<Effect> {
        let Some(event) = self.selected_event().cloned() else {
            self.set_status("Nothing selected");
            return Vec::new();
        };
        self.set_status(format!(
            "{}: {}",
            if cut { "Cut" } else { "Copied" },
            event.description
        ));
        self.clipboard = Some(Clipboard {
            event: event.clone(),
            cut: false,
        });
        self.pending_cut = cut;
        if cut { vec![Effect::Remove(event)] } else { Vec::new() }
    }

    /// Re-create the clipboard event at the cursor.
    fn paste(&mut self) -> Vec<Effect> {
        let Some(clip) = self.clipboard.clone() else {
            self.set_status("Clipboard is empty");
            return Vec::new();
        };

        let mut event = clip.event;
        event.date = self.cursor.selected_date();
        match self.cursor.focus {
            Focus::Timed => event.time = Some(self.cursor.selected_time()),
            Focus::Untimed => {
                event.time = None;
                event.duration = None;
            }
        }
        event.event_type = match (event.event_type, event.time) {
            (EventType::Note, Some(_)) => EventType::Reminder,
            (EventType::Reminder, None) => EventType::Note,
            (kind, _) => kind,
        };
        event.source_file = None;
        event.source_line = None;
        vec![Effect::Append(event)]
    }
}

/// Status line text for an error from a write or load.
pub fn describe(err: &UrdError) -> String {
    match err {
        UrdError::Syntax { .. } => format!("{err} (press e to edit)"),
        other => other.to_string(),
    }
}
