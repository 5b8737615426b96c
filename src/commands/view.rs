use anyhow::{Context, Result};
use chrono::NaiveDate;
use urd_core::config::UrdConfig;
use urd_core::schedule::{Cursor, Increment};
use urd_core::source::EventSource;

use super::Sources;
use crate::app::{App, Msg};

pub async fn run(
    config: &UrdConfig,
    date: Option<String>,
    increment: Option<u32>,
    rows: u16,
    width: u16,
) -> Result<()> {
    let sources = Sources::from_config(config);
    let now = super::now();

    let increment = match increment {
        Some(minutes) => Increment::from_minutes(minutes)
            .with_context(|| format!("Increment must be 15, 30 or 60 (got {minutes})"))?,
        None => config.increment(),
    };
    let viewport = super::viewport(config, rows, width);
    let visible = viewport.visible_slots(increment);

    let mut cursor = Cursor::at(now, increment, visible);
    if let Some(date) = date {
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{date}', expected YYYY-MM-DD"))?;
        cursor.goto_date(date);
    }

    let mut app = App::new(cursor, viewport, now, config.idle_advance_minutes);
    let range = app.wanted_range();
    let events = sources.all.get_events(range).await;
    app.update(Msg::EventsLoaded(range, events));

    for line in super::screen(&app, now) {
        println!("{line}");
    }
    Ok(())
}
