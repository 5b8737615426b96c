//! Forward search from the cursor.

use chrono::{Duration, Months};

use super::cursor::{Cursor, Focus};
use super::layout::{compare_events, untimed_for_day};
use super::slot;
use crate::date_range::DateRange;
use crate::error::UrdResult;
use crate::event::Event;
use crate::source::EventSource;

/// A search match and, for untimed events, its position in the day's sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub event: Event,
    pub untimed_index: Option<usize>,
}

fn untimed_index_of(events: &[Event], event: &Event) -> Option<usize> {
    untimed_for_day(events, event.date)
        .iter()
        .position(|e| e.id == event.id)
}

/// Whether `event` comes after the cursor position.
fn strictly_after(event: &Event, cursor: &Cursor, events: &[Event]) -> bool {
    let cursor_date = cursor.selected_date();
    if event.date != cursor_date {
        return event.date > cursor_date;
    }
    match event.time {
        Some(time) => {
            slot::global_slot(event.date, time, cursor.reference_date, cursor.increment)
                > cursor.selected_slot
        }
        None => match cursor.focus {
            Focus::Timed => true,
            Focus::Untimed => {
                untimed_index_of(events, event).is_some_and(|i| i > cursor.untimed_index)
            }
        },
    }
}

/// First event after the cursor whose description or a tag contains `term`.
pub fn find_next(events: &[Event], cursor: &Cursor, term: &str) -> Option<Found> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| compare_events(a, b)));

    ordered
        .into_iter()
        .filter(|e| e.matches(term))
        .find(|e| strictly_after(e, cursor, events))
        .map(|event| Found {
            event: event.clone(),
            untimed_index: if event.is_timed() {
                None
            } else {
                untimed_index_of(events, event)
            },
        })
}

/// Move the cursor onto a match.
pub fn apply_found(cursor: &mut Cursor, found: &Found, visible_slots: i64) {
    match found.event.time {
        Some(time) => cursor.select_timed(found.event.date, time, visible_slots),
        None => cursor.select_untimed(found.event.date, found.untimed_index.unwrap_or(0)),
    }
}

/// Search the loaded events, then up to one month past `loaded` through `source`.
pub async fn find_next_widening(
    source: &dyn EventSource,
    events: &[Event],
    loaded: DateRange,
    cursor: &Cursor,
    term: &str,
) -> UrdResult<Option<Found>> {
    if let Some(found) = find_next(events, cursor, term) {
        return Ok(Some(found));
    }

    let start = loaded.end + Duration::days(1);
    let end = loaded
        .end
        .checked_add_months(Months::new(1))
        .unwrap_or(start);
    let more = source.get_events(DateRange::new(start, end)).await?;
    Ok(find_next(&more, cursor, term))
}
