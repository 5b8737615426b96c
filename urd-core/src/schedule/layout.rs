//! Schedule layout engine.
//!
//! Turns a cursor, a viewport and the loaded events into absolutely
//! positioned drawables. The engine is pure: the same inputs always give
//! the same drawable list, so the terminal shell only has to paint it.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use super::cursor::{Cursor, Focus};
use super::slot::{self, Increment};
use crate::event::{Event, EventType, Priority};

/// Blank columns between event lanes.
pub const PADDING: u16 = 1;
pub const MIN_COLUMN_WIDTH: u16 = 10;
pub const MAX_COLUMN_WIDTH: u16 = 60;
/// Widest an event may grow, in lanes.
pub const MAX_COLUMN_SPAN: usize = 3;
/// Lanes scanned before an event is stacked on lane 0 unreserved.
pub const MAX_COLUMNS: usize = 10;

const ELLIPSIS: &str = "...";
const LABEL_SLACK: usize = 3;

/// Terminal area given to the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub rows: u16,
    pub time_col_width: u16,
    pub event_area_width: u16,
}

impl Viewport {
    /// Largest number of slots that fit in `rows` with the worst-case number
    /// of date headers.
    pub fn visible_slots(&self, increment: Increment) -> i64 {
        let rows = i64::from(self.rows);
        let spd = increment.slots_per_day();
        let mut slots = rows - 1;
        while slots > 0 && slots + 1 + (slots - 1 + spd - 1) / spd > rows {
            slots -= 1;
        }
        slots.max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawableKind {
    DateHeader,
    TimeLabel,
    EventBlock,
}

/// Styling request passed through to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleHint {
    Plain,
    /// Date header of the current day.
    Today,
    /// Time label of the slot containing the current time.
    TodayNow,
    Selected,
    Event {
        priority: Priority,
        event_type: EventType,
        selected: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Drawable {
    pub kind: DrawableKind,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub z: u8,
    pub text: String,
    pub style: StyleHint,
}

/// Where a timed event landed on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub id: String,
    /// First visible global slot.
    pub start_slot: i64,
    /// One past the last visible global slot.
    pub end_slot: i64,
    pub column: usize,
    pub column_span: usize,
}

impl Placement {
    pub fn columns(&self) -> std::ops::Range<usize> {
        self.column..self.column + self.column_span
    }

    pub fn slots(&self) -> std::ops::Range<i64> {
        self.start_slot..self.end_slot
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub drawables: Vec<Drawable>,
    pub placements: Vec<Placement>,
    pub num_columns: usize,
    pub column_width: u16,
    pub visible_slots: i64,
}

/// Total display order of events.
///
/// Timed before untimed, then date, time, priority (highest first),
/// description and id.
pub fn compare_events(a: &Event, b: &Event) -> Ordering {
    b.is_timed()
        .cmp(&a.is_timed())
        .then_with(|| a.date.cmp(&b.date))
        .then_with(|| a.time.cmp(&b.time))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.id.cmp(&b.id))
}

/// Untimed events of `date`, in sidebar order.
pub fn untimed_for_day(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    let mut day: Vec<&Event> = events
        .iter()
        .filter(|e| !e.is_timed() && e.date == date)
        .collect();
    day.sort_by(|a, b| compare_events(a, b));
    day
}

/// Row of each visible slot, replaying the day-transition walk.
///
/// Each new day inside the viewport costs one header row before its first
/// slot. The walk stops early if `rows` runs out.
fn slot_rows(top_slot: i64, visible_slots: i64, increment: Increment, rows: u16) -> Vec<(u16, Option<u16>)> {
    let mut out = Vec::new();
    let mut row: u16 = 0;
    let mut prev_day: Option<i64> = None;

    for i in 0..visible_slots {
        let day = slot::day_offset(top_slot + i, increment);
        let mut header = None;
        if prev_day != Some(day) {
            if row >= rows {
                break;
            }
            header = Some(row);
            row += 1;
            prev_day = Some(day);
        }
        if row >= rows {
            break;
        }
        out.push((row, header));
        row += 1;
    }
    out
}

struct Pending<'a> {
    event: &'a Event,
    start: i64,
    end: i64,
    column: usize,
    span: usize,
    reserved: bool,
}

#[derive(Default)]
struct Occupancy(HashSet<(i64, usize)>);

impl Occupancy {
    fn is_free(&self, slots: std::ops::Range<i64>, column: usize) -> bool {
        slots.into_iter().all(|s| !self.0.contains(&(s, column)))
    }

    fn reserve(&mut self, slots: std::ops::Range<i64>, column: usize) {
        for s in slots {
            self.0.insert((s, column));
        }
    }
}

fn column_width(area: u16, columns: usize) -> u16 {
    let columns = columns.max(1) as u16;
    area.saturating_sub(PADDING * (columns - 1)) / columns
}

fn block_width(col_width: u16, span: usize) -> u16 {
    let span = span.max(1) as u16;
    col_width.saturating_mul(span).saturating_add(PADDING * (span - 1))
}

/// Truncate to `width` characters, ending in `...` when cut.
pub fn truncate_label(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= ELLIPSIS.len() {
        return text.chars().take(width).collect();
    }
    let mut out: String = text.chars().take(width - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Assign lanes to the timed events visible in `[top, top + visible)`.
fn place_events<'a>(
    events: &'a [Event],
    cursor: &Cursor,
    top: i64,
    visible: i64,
    area_width: u16,
) -> Vec<Pending<'a>> {
    let increment = cursor.increment;
    let mut timed: Vec<&Event> = events.iter().filter(|e| e.is_timed()).collect();
    timed.sort_by(|a, b| compare_events(a, b));

    let window_end = top + visible;
    let mut occupancy = Occupancy::default();
    let mut pending: Vec<Pending> = Vec::new();

    for event in timed {
        let Some(time) = event.time else { continue };
        let start = slot::global_slot(event.date, time, cursor.reference_date, increment);
        let end = start + slot::span_slots(event.duration_minutes(), increment);
        let clipped_start = start.max(top);
        let clipped_end = end.min(window_end);
        if clipped_start >= clipped_end {
            continue;
        }

        let free = (0..MAX_COLUMNS).find(|&c| occupancy.is_free(clipped_start..clipped_end, c));
        let (column, reserved) = match free {
            Some(c) => {
                occupancy.reserve(clipped_start..clipped_end, c);
                (c, true)
            }
            None => (0, false),
        };

        pending.push(Pending {
            event,
            start: clipped_start,
            end: clipped_end,
            column,
            span: 1,
            reserved,
        });
    }

    widen(&mut pending, &mut occupancy, area_width);
    pending
}

/// Grow blocks whose label does not fit into free lanes to their right.
fn widen(pending: &mut [Pending], occupancy: &mut Occupancy, area_width: u16) {
    let num_cols = pending.iter().map(|p| p.column + 1).max().unwrap_or(1);
    let initial_width = column_width(area_width, num_cols);
    let lane_limit = num_cols.max(usize::from(
        area_width.saturating_add(PADDING) / (MIN_COLUMN_WIDTH + PADDING),
    ));

    for p in pending.iter_mut().filter(|p| p.reserved) {
        let text_len = p.event.description.chars().count();
        while text_len + LABEL_SLACK > usize::from(block_width(initial_width, p.span))
            && p.span < MAX_COLUMN_SPAN
        {
            let next = p.column + p.span;
            if next >= lane_limit || !occupancy.is_free(p.start..p.end, next) {
                break;
            }
            occupancy.reserve(p.start..p.end, next);
            p.span += 1;
        }
    }
}

/// Lay out the visible window.
pub fn layout(cursor: &Cursor, viewport: &Viewport, events: &[Event], now: NaiveDateTime) -> Schedule {
    let increment = cursor.increment;
    let top = cursor.top_slot;
    let rows = slot_rows(top, viewport.visible_slots(increment), increment, viewport.rows);
    let visible = rows.len() as i64;

    let mut drawables = Vec::new();
    let now_slot = slot::time_to_slot(now.time(), increment);

    for (i, (row, header)) in rows.iter().enumerate() {
        let global = top + i as i64;
        let date = slot::slot_date(global, cursor.reference_date, increment);

        if let Some(header_row) = header {
            drawables.push(Drawable {
                kind: DrawableKind::DateHeader,
                x: 0,
                y: *header_row,
                width: viewport.time_col_width.saturating_add(viewport.event_area_width),
                height: 1,
                z: 0,
                text: date.format("%a %b %-d %Y").to_string(),
                style: if date == now.date() { StyleHint::Today } else { StyleHint::Plain },
            });
        }

        let style = if global == cursor.selected_slot {
            StyleHint::Selected
        } else if date == now.date() && slot::local_slot(global, increment) == now_slot {
            StyleHint::TodayNow
        } else {
            StyleHint::Plain
        };

        drawables.push(Drawable {
            kind: DrawableKind::TimeLabel,
            x: 0,
            y: *row,
            width: viewport.time_col_width,
            height: 1,
            z: 0,
            text: slot::slot_time(global, increment).format("%H:%M").to_string(),
            style,
        });
    }

    let pending = place_events(events, cursor, top, visible, viewport.event_area_width);
    let num_columns = pending
        .iter()
        .map(|p| p.column + p.span)
        .max()
        .unwrap_or(1);
    let col_width =
        column_width(viewport.event_area_width, num_columns).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);

    let mut placements = Vec::with_capacity(pending.len());
    for p in &pending {
        let first_row = rows[(p.start - top) as usize].0;
        let last_row = rows[(p.end - 1 - top) as usize].0;
        let width = block_width(col_width, p.span);
        let selected = cursor.focus == Focus::Timed
            && (p.start..p.end).contains(&cursor.selected_slot);

        drawables.push(Drawable {
            kind: DrawableKind::EventBlock,
            x: viewport.time_col_width + p.column as u16 * (col_width + PADDING),
            y: first_row,
            width,
            height: last_row - first_row + 1,
            z: 1,
            text: truncate_label(&p.event.description, usize::from(width)),
            style: StyleHint::Event {
                priority: p.event.priority,
                event_type: p.event.event_type,
                selected,
            },
        });

        placements.push(Placement {
            id: p.event.id.clone(),
            start_slot: p.start,
            end_slot: p.end,
            column: p.column,
            column_span: p.span,
        });
    }

    Schedule {
        drawables,
        placements,
        num_columns,
        column_width: col_width,
        visible_slots: visible,
    }
}
