//! Terminal rendering for urd types.
//!
//! The layout engine produces positioned drawables; this module paints them
//! onto a character grid and colours each run of cells with owo_colors.

use owo_colors::OwoColorize;
use urd_core::event::{Event, EventType, Priority};
use urd_core::schedule::{Drawable, DrawableKind, Schedule, StyleHint, Viewport};

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Priority {
    fn render(&self) -> String {
        let marker = self.marker();
        match self {
            Priority::High => marker.red().bold().to_string(),
            Priority::Medium => marker.yellow().to_string(),
            Priority::Low => marker.green().to_string(),
            Priority::None => String::new(),
        }
    }
}

impl Render for Event {
    fn render(&self) -> String {
        let time = match self.time {
            Some(time) => format!("{:>7}", time.format("%H:%M")),
            None => format!("{:>7}", "all-day"),
        };
        let duration = match self.duration_minutes() {
            Some(minutes) if minutes > 0 => format!(" ({}m)", minutes),
            _ => String::new(),
        };
        let tags = if self.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", self.tags.join(", "))
        };

        format!(
            "  {} {}{}{}{}",
            time,
            colorize_event(self.event_type, self.priority, &self.description),
            self.priority.render(),
            duration.dimmed(),
            tags.dimmed()
        )
    }
}

fn colorize_event(kind: EventType, priority: Priority, text: &str) -> String {
    match (priority, kind) {
        (Priority::High, _) => text.red().to_string(),
        (Priority::Medium, _) => text.yellow().to_string(),
        (Priority::Low, _) => text.green().to_string(),
        (Priority::None, EventType::Todo) => text.magenta().to_string(),
        (Priority::None, EventType::Note) => text.cyan().to_string(),
        (Priority::None, EventType::Reminder) => text.to_string(),
    }
}

/// Paint one run of cells.
fn paint(text: &str, style: StyleHint) -> String {
    match style {
        StyleHint::Plain => text.to_string(),
        StyleHint::Today => text.bold().to_string(),
        StyleHint::TodayNow => text.yellow().bold().to_string(),
        StyleHint::Selected => text.reversed().to_string(),
        StyleHint::Event {
            priority,
            event_type,
            selected,
        } => {
            let base = match (priority, event_type) {
                (Priority::High, _) => text.white().on_red().to_string(),
                (Priority::Medium, _) => text.black().on_yellow().to_string(),
                (Priority::Low, _) => text.black().on_green().to_string(),
                (Priority::None, EventType::Todo) => text.white().on_magenta().to_string(),
                (Priority::None, _) => text.white().on_blue().to_string(),
            };
            if selected {
                base.reversed().to_string()
            } else {
                base
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Cell {
    ch: char,
    style: StyleHint,
}

/// Paint the drawables onto `viewport.rows` lines of text.
pub fn compose(schedule: &Schedule, viewport: &Viewport) -> Vec<String> {
    let width = usize::from(viewport.time_col_width + viewport.event_area_width);
    let rows = usize::from(viewport.rows);
    let blank = Cell {
        ch: ' ',
        style: StyleHint::Plain,
    };
    let mut grid = vec![vec![blank; width]; rows];

    let mut ordered: Vec<&Drawable> = schedule.drawables.iter().collect();
    ordered.sort_by_key(|d| d.z);
    for drawable in ordered {
        draw(&mut grid, drawable);
    }

    grid.iter().map(|row| render_row(row)).collect()
}

fn draw(grid: &mut [Vec<Cell>], drawable: &Drawable) {
    let x0 = usize::from(drawable.x);
    let y0 = usize::from(drawable.y);
    let height = usize::from(drawable.height.max(1));

    for dy in 0..height {
        let Some(row) = grid.get_mut(y0 + dy) else { break };
        let mut text: Vec<char> = match (drawable.kind, dy) {
            (_, 0) => drawable.text.chars().collect(),
            (DrawableKind::EventBlock, _) => vec!['|'],
            _ => Vec::new(),
        };
        text.resize(usize::from(drawable.width), ' ');

        for (dx, ch) in text.into_iter().enumerate() {
            if let Some(cell) = row.get_mut(x0 + dx) {
                *cell = Cell {
                    ch,
                    style: drawable.style,
                };
            }
        }
    }
}

fn render_row(row: &[Cell]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    let mut current: Option<StyleHint> = None;

    for cell in row {
        if current != Some(cell.style) {
            if let Some(style) = current {
                out.push_str(&paint(&run, style));
            }
            run.clear();
            current = Some(cell.style);
        }
        run.push(cell.ch);
    }
    if let Some(style) = current {
        out.push_str(&paint(&run, style));
    }
    out.trim_end().to_string()
}

/// Untimed list for the selected day; `selected` marks the focused entry.
pub fn sidebar(events: &[&Event], selected: Option<usize>) -> Vec<String> {
    if events.is_empty() {
        return vec![format!("  {}", "No untimed events".dimmed())];
    }
    events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let line = format!("{}{}", event.description, event.priority.marker());
            if Some(i) == selected {
                format!("> {}", line.reversed())
            } else {
                format!("  {}", colorize_event(event.event_type, event.priority, &line))
            }
        })
        .collect()
}

/// Count with its noun, e.g. "1 event", "3 events".
pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}
