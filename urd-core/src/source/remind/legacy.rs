//! remind's simple-calendar text output, used when JSON is unavailable.
//!
//! ```text
//! # fileinfo 3 /home/me/.reminders
//! 2024/03/15 * * 60 540 Standup @work
//! ```

use chrono::NaiveDate;

use super::json::{build_event, minutes_to_time, strip_color};
use crate::event::{DEFAULT_IMPORTANCE, Event};

/// Parse every recognised line; anything else is skipped.
pub fn parse(output: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut provenance: Option<(u32, String)> = None;

    for line in output.lines() {
        let line = line.trim_end();
        if let Some(info) = line.strip_prefix("# fileinfo ") {
            provenance = parse_fileinfo(info);
            continue;
        }
        if let Some(event) = parse_line(line, provenance.take()) {
            events.push(event);
        }
    }
    events
}

fn parse_fileinfo(info: &str) -> Option<(u32, String)> {
    let (line, file) = info.trim().split_once(char::is_whitespace)?;
    Some((line.parse().ok()?, file.trim().to_string()))
}

fn parse_line(line: &str, provenance: Option<(u32, String)>) -> Option<Event> {
    let mut fields = line.splitn(6, ' ');
    let date = NaiveDate::parse_from_str(fields.next()?, "%Y/%m/%d").ok()?;
    let special = fields.next()?;
    let _tag = fields.next()?;
    let duration = fields.next()?;
    let time = fields.next()?;
    let body = fields.next().unwrap_or("");

    // SHADE, MOON and friends are not reminders.
    let body = if special == "*" {
        body
    } else if special.eq_ignore_ascii_case("COLOR") || special.eq_ignore_ascii_case("COLOUR") {
        strip_color(body)
    } else {
        return None;
    };

    let time = optional_minutes(time)?.and_then(minutes_to_time);
    let duration = optional_minutes(duration)?;
    let (line_no, file) = match provenance {
        Some((line_no, file)) => (Some(line_no), Some(file)),
        None => (None, None),
    };

    Some(build_event(
        date,
        time,
        duration,
        body,
        DEFAULT_IMPORTANCE,
        Vec::new(),
        file,
        line_no,
    ))
}

/// `*` is "none"; anything else must be a number of minutes.
fn optional_minutes(field: &str) -> Option<Option<i64>> {
    if field == "*" {
        Some(None)
    } else {
        field.parse().ok().map(Some)
    }
}
