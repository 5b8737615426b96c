use anyhow::Result;
use owo_colors::OwoColorize;
use urd_core::config::UrdConfig;
use urd_core::date_range::DateRange;
use urd_core::schedule::{Cursor, find_next_widening};
use urd_core::source::EventSource;

use super::Sources;
use crate::render::Render;

/// Search the loaded window and the month after it, then ask remind for
/// anything further out.
pub async fn run(config: &UrdConfig, term: &str) -> Result<()> {
    let sources = Sources::from_config(config);
    let now = super::now();
    let increment = config.increment();
    let cursor = Cursor::at(now, increment, 1);

    let loaded = DateRange::days_from(now.date(), 7);
    let events = sources.all.get_events(loaded).await?;

    let found = match find_next_widening(&sources.all, &events, loaded, &cursor, term).await? {
        Some(found) => Some(found.event),
        None => sources.remind.find_next(term, now).await?,
    };

    match found {
        Some(event) => {
            println!("{}", event.date.format("%a %b %-d %Y").to_string().bold());
            println!("{}", event.render());
        }
        None => println!("{}", format!("No match for '{term}'").dimmed()),
    }
    Ok(())
}
