use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use owo_colors::OwoColorize;
use urd_core::config::UrdConfig;
use urd_core::source::RemindSource;
use urd_core::source::remind::QuickEntry;

use crate::utils::editor;

pub async fn run(
    config: &UrdConfig,
    when: &str,
    description: &str,
    duration: Option<&str>,
) -> Result<()> {
    let when = parse_when(when)?;
    let duration = duration.map(parse_duration).transpose()?;
    if duration.is_some() && when.time.is_none() {
        anyhow::bail!("--duration needs a time of day, e.g. \"fri 3pm\"");
    }

    let remind = RemindSource::from_config(config);

    // No text: write the template line and let the user finish it.
    if description.trim().is_empty() {
        let (path, line) = match when.time {
            Some(time) => remind.add_timed_event_from_template(when.date, time, duration)?,
            None => remind.add_event_from_template(when.date)?,
        };
        println!(
            "  {}",
            format!("Template added at {}:{}", path.display(), line).dimmed()
        );
        editor::launch(&config.editor, &path, Some(line)).await?;
        return Ok(());
    }

    let entry = QuickEntry {
        date: when.date,
        time: when.time,
        duration,
        description: description.trim().to_string(),
    };
    let (path, line) = remind.add_quick_event(&entry)?;

    println!("{}", format!("  Created: {}", entry.description).green());
    println!("  {}", format!("{}:{}", path.display(), line).dimmed());
    Ok(())
}

/// A parsed `when`: the day, and the time of day if the input named one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct When {
    date: NaiveDate,
    time: Option<NaiveTime>,
}

/// Spell out day and month abbreviations fuzzydate does not know.
fn expand_abbreviations(input: &str) -> String {
    input
        .to_lowercase()
        .split_whitespace()
        .map(|word| match word {
            "mon" => "monday",
            "tue" | "tues" => "tuesday",
            "wed" => "wednesday",
            "thu" | "thur" | "thurs" => "thursday",
            "fri" => "friday",
            "sat" => "saturday",
            "sun" => "sunday",
            "jan" => "january",
            "feb" => "february",
            "mar" => "march",
            "apr" => "april",
            "jun" => "june",
            "jul" => "july",
            "aug" => "august",
            "sep" | "sept" => "september",
            "oct" => "october",
            "nov" => "november",
            "dec" => "december",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a natural-language date, keeping the time only when one was typed.
fn parse_when(input: &str) -> Result<When> {
    let expanded = expand_abbreviations(input);
    let parsed = fuzzydate::parse(&expanded)
        .map_err(|_| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))?;

    Ok(When {
        date: parsed.date(),
        time: names_a_time(input).then(|| parsed.time()),
    })
}

/// Whether the input names a time of day: `noon`, `6pm`, `9 am`, `15:30` or
/// `at 3`.
fn names_a_time(input: &str) -> bool {
    let lower = input.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    words.iter().enumerate().any(|(i, word)| {
        let previous = i.checked_sub(1).map(|p| words[p]);
        let starts_with_digit = word.starts_with(|c: char| c.is_ascii_digit());

        match *word {
            "noon" | "midnight" => true,
            "am" | "pm" => previous.is_some_and(|p| p.ends_with(|c: char| c.is_ascii_digit())),
            _ if starts_with_digit && (word.ends_with("am") || word.ends_with("pm")) => true,
            _ if starts_with_digit && word.contains(':') => {
                word.split(':').nth(1).is_some_and(|m| m.starts_with(|c: char| c.is_ascii_digit()))
            }
            _ => starts_with_digit && previous == Some("at"),
        }
    })
}

/// Parse a human duration such as `45m` or `1h 30m`.
fn parse_duration(input: &str) -> Result<Duration> {
    let std_duration = humantime::parse_duration(input)
        .with_context(|| format!("Could not parse duration: \"{}\"", input))?;
    Duration::from_std(std_duration).context("Duration too large")
}
