//! Layout scenarios, properties of the slot model and of the composite merge.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;
use tokio::sync::mpsc;

use urd_core::date_range::DateRange;
use urd_core::schedule::slot::{self, Increment};
use urd_core::schedule::{Cursor, Viewport, layout, untimed_for_day};
use urd_core::source::{CompositeSource, EventSource, SourceChange, SourceFuture, WATCH_CHANNEL_CAPACITY};
use urd_core::{Event, UrdError, UrdResult};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn timed(id: &str, date: NaiveDate, h: u32, m: u32, minutes: i64, text: &str) -> Event {
    Event::timed(
        id,
        date.and_hms_opt(h, m, 0).unwrap(),
        Some(Duration::minutes(minutes)),
        text,
    )
}

fn noon(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn untimed_and_timed_on_the_same_day() {
    let day = d(2024, 3, 15);
    let events = vec![
        Event::untimed("all-day", day, "All day"),
        timed("standup", day, 9, 0, 60, "Standup"),
        timed("sync", day, 9, 30, 60, "Sync"),
    ];
    let mut cursor = Cursor::new(day, Increment::Thirty);
    cursor.top_slot = 18;
    cursor.selected_slot = 18;
    let viewport = Viewport {
        rows: 10,
        time_col_width: 6,
        event_area_width: 60,
    };

    let schedule = layout(&cursor, &viewport, &events, noon(day));
    assert_eq!(schedule.visible_slots, 8);

    let standup = &schedule.placements[0];
    assert_eq!(standup.id, "standup");
    assert_eq!((standup.start_slot, standup.end_slot), (18, 20));
    assert_eq!((standup.column, standup.column_span), (0, 1));

    let sync = &schedule.placements[1];
    assert_eq!(sync.id, "sync");
    assert_eq!((sync.start_slot, sync.end_slot), (19, 21));
    assert_eq!((sync.column, sync.column_span), (1, 1));

    assert_eq!(schedule.placements.len(), 2);
    assert!(schedule.drawables.iter().all(|dr| dr.text != "All day"));

    let sidebar: Vec<&str> = untimed_for_day(&events, day)
        .iter()
        .map(|e| e.description.as_str())
        .collect();
    assert_eq!(sidebar, vec!["All day"]);
}

#[test]
fn long_description_widens_into_a_free_column() {
    let day = d(2024, 3, 15);
    let long = "x".repeat(70);
    let mut cursor = Cursor::new(day, Increment::Sixty);
    cursor.top_slot = 6;
    let viewport = Viewport {
        rows: 10,
        time_col_width: 6,
        event_area_width: 30,
    };

    let alone = vec![timed("long", day, 8, 0, 60, &long)];
    let schedule = layout(&cursor, &viewport, &alone, noon(day));
    assert_eq!(schedule.placements[0].column_span, 2);
    assert_eq!(schedule.num_columns, 2);

    let crowded = vec![
        timed("long", day, 8, 0, 60, &long),
        timed("a", day, 8, 0, 60, "A"),
        timed("b", day, 8, 0, 60, "B"),
        timed("c", day, 8, 0, 60, "C"),
    ];
    let schedule = layout(&cursor, &viewport, &crowded, noon(day));
    let placement = schedule
        .placements
        .iter()
        .find(|p| p.id == "long")
        .unwrap();
    assert_eq!(placement.column_span, 1);
    assert_eq!(schedule.num_columns, 4);
}

// ===========================================================================
// Property Tests
// ===========================================================================

fn increment() -> impl Strategy<Value = Increment> {
    prop::sample::select(Increment::ALL.to_vec())
}

fn event_strategy() -> impl Strategy<Value = (u32, u32, i64, usize)> {
    (6u32..14, prop::sample::select(vec![0u32, 15, 30, 45]), 0i64..180, 1usize..40)
}

/// Fixed events held in memory; `None` fails every load.
struct MemorySource {
    name: String,
    events: Option<Vec<Event>>,
}

impl EventSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_events(&self, _range: DateRange) -> SourceFuture<'_, Vec<Event>> {
        let result = self
            .events
            .clone()
            .ok_or_else(|| UrdError::CommandFailure(format!("{} is down", self.name)));
        Box::pin(async move { result })
    }

    fn test_connection(&self) -> SourceFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn watch_files(&self) -> UrdResult<mpsc::Receiver<SourceChange>> {
        let (_tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        Ok(rx)
    }

    fn stop_watching(&self) {}
}

/// Per source: whether it loads, and the ids it holds.
fn source_specs() -> impl Strategy<Value = Vec<(bool, BTreeSet<u8>)>> {
    prop::collection::vec(
        (prop::bool::weighted(0.8), prop::collection::btree_set(0u8..12, 0..8)),
        1..6,
    )
}

proptest! {
    #[test]
    fn prop_slot_time_bijection(inc in increment(), s in -96i64..192) {
        let (day, hour, minute) = slot::slot_to_coords(s, inc);
        prop_assert_eq!(slot::coords_to_slot(day, hour, minute, inc), s);

        let reference = d(2024, 3, 15);
        let date = slot::slot_date(s, reference, inc);
        let time = slot::slot_time(s, inc);
        prop_assert_eq!(slot::global_slot(date, time, reference, inc), s);
    }

    #[test]
    fn prop_zoom_preserves_displayed_time(
        from in increment(),
        to in increment(),
        s in -96i64..192,
        top_back in 0i64..8,
    ) {
        let mut cursor = Cursor::new(d(2024, 3, 15), from);
        cursor.selected_slot = s;
        cursor.top_slot = s - top_back;
        let before = slot::slot_date(s, cursor.reference_date, from)
            .and_time(slot::slot_time(s, from));

        cursor.set_increment(to, 16);

        let after = cursor.selected_date().and_time(cursor.selected_time());
        let floored = (before.time().hour_minutes() / to.minutes()) * to.minutes();
        prop_assert_eq!(after.date(), before.date());
        prop_assert_eq!(after.time().hour_minutes(), floored);
        prop_assert!(cursor.selected_slot >= cursor.top_slot);
        prop_assert!(cursor.selected_slot < cursor.top_slot + 16);
    }

    #[test]
    fn prop_canonicalization_keeps_position(inc in increment(), s in -300i64..300, gap in 0i64..20) {
        let mut cursor = Cursor::new(d(2024, 3, 15), inc);
        cursor.selected_slot = s;
        cursor.top_slot = s - gap;
        let date = cursor.selected_date();
        let time = cursor.selected_time();

        cursor.update_selected_date_from_slot();

        prop_assert!((0..inc.slots_per_day()).contains(&cursor.selected_slot));
        prop_assert_eq!(cursor.reference_date, date);
        prop_assert_eq!(cursor.selected_time(), time);
        prop_assert_eq!(cursor.selected_slot - cursor.top_slot, gap);
    }

    #[test]
    fn prop_layout_is_deterministic(specs in prop::collection::vec(event_strategy(), 0..10)) {
        let day = d(2024, 3, 15);
        let events: Vec<Event> = specs
            .iter()
            .enumerate()
            .map(|(i, (h, m, minutes, len))| {
                timed(&format!("e{i}"), day, *h, *m, *minutes, &"w".repeat(*len))
            })
            .collect();
        let mut cursor = Cursor::new(day, Increment::Thirty);
        cursor.top_slot = 12;
        let viewport = Viewport { rows: 20, time_col_width: 6, event_area_width: 80 };

        let first = layout(&cursor, &viewport, &events, noon(day));
        let again = layout(&cursor, &viewport, &events, noon(day));
        let mut reversed = events.clone();
        reversed.reverse();
        let shuffled = layout(&cursor, &viewport, &reversed, noon(day));

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &shuffled);
    }

    #[test]
    fn prop_overlapping_blocks_never_share_columns(
        specs in prop::collection::vec(event_strategy(), 0..10),
        inc in increment(),
        width in 20u16..200,
    ) {
        let day = d(2024, 3, 15);
        let events: Vec<Event> = specs
            .iter()
            .enumerate()
            .map(|(i, (h, m, minutes, len))| {
                timed(&format!("e{i}"), day, *h, *m, *minutes, &"w".repeat(*len))
            })
            .collect();
        let mut cursor = Cursor::new(day, inc);
        cursor.top_slot = 5 * inc.slots_per_hour();
        let viewport = Viewport { rows: 40, time_col_width: 6, event_area_width: width };

        let schedule = layout(&cursor, &viewport, &events, noon(day));
        for (i, a) in schedule.placements.iter().enumerate() {
            for b in &schedule.placements[i + 1..] {
                let slots_overlap = a.start_slot < b.end_slot && b.start_slot < a.end_slot;
                let columns_overlap = a.column < b.column + b.column_span
                    && b.column < a.column + a.column_span;
                prop_assert!(
                    !(slots_overlap && columns_overlap),
                    "{:?} and {:?} overlap",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn prop_composite_keeps_first_source_per_id(specs in source_specs()) {
        let day = d(2024, 3, 15);
        let sources: Vec<Box<dyn EventSource>> = specs
            .iter()
            .enumerate()
            .map(|(i, (up, ids))| {
                let events = ids
                    .iter()
                    .map(|id| Event::untimed(format!("evt-{id}"), day, format!("from {i}")))
                    .collect();
                Box::new(MemorySource { name: format!("s{i}"), events: up.then_some(events) })
                    as Box<dyn EventSource>
            })
            .collect();

        let mut expected: BTreeMap<String, String> = BTreeMap::new();
        for (i, (up, ids)) in specs.iter().enumerate() {
            if !up {
                continue;
            }
            for id in ids {
                expected.entry(format!("evt-{id}")).or_insert_with(|| format!("from {i}"));
            }
        }

        let composite = CompositeSource::new(sources);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let merged = runtime
            .block_on(composite.get_events(DateRange::days_from(day, 1)))
            .unwrap();

        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for event in merged {
            prop_assert!(
                seen.insert(event.id.clone(), event.description.clone()).is_none(),
                "{} appears twice",
                event.id
            );
        }
        prop_assert_eq!(seen, expected);
    }
}

trait HourMinutes {
    fn hour_minutes(&self) -> i64;
}

impl HourMinutes for NaiveTime {
    fn hour_minutes(&self) -> i64 {
        use chrono::Timelike;
        i64::from(self.hour()) * 60 + i64::from(self.minute())
    }
}
