use anyhow::Result;
use chrono::NaiveDate;
use owo_colors::OwoColorize;
use urd_core::config::UrdConfig;
use urd_core::date_range::DateRange;
use urd_core::schedule::layout::compare_events;
use urd_core::source::EventSource;

use super::Sources;
use crate::render::Render;

pub async fn run(config: &UrdConfig, from: Option<&str>, to: Option<&str>) -> Result<()> {
    let today = super::now().date();
    let range = DateRange::from_args(from, to, today).map_err(|e| anyhow::anyhow!(e))?;
    let sources = Sources::from_config(config);

    let mut events = sources.all.get_events(range).await?;
    events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| compare_events(a, b)));

    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    // Group events by day and print
    let mut current_date: Option<NaiveDate> = None;

    for event in &events {
        if current_date != Some(event.date) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", format_date_label(event.date, today).bold());
            current_date = Some(event.date);
        }
        println!("{}", event.render());
    }

    Ok(())
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
fn format_date_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_labels() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 24).unwrap();
        assert_eq!(format_date_label(today, today), "Today");
        assert_eq!(format_date_label(today.succ_opt().unwrap(), today), "Tomorrow");
        assert_eq!(
            format_date_label(NaiveDate::from_ymd_opt(2025, 2, 26).unwrap(), today),
            "Wed Feb 26"
        );
    }
}
