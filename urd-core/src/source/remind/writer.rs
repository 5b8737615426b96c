//! Appending and removing reminder lines.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};

use crate::error::{UrdError, UrdResult};
use crate::event::{Event, Priority};

/// A reminder typed by the user rather than built from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickEntry {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub duration: Option<Duration>,
    pub description: String,
}

/// `Aug 19 2025`, the date form remind reads back.
pub fn format_date(date: NaiveDate) -> String {
    format!("{} {} {}", date.format("%b"), date.day(), date.year())
}

/// `H:MM`, remind's DURATION form.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Fill a line template.
///
/// A single trailing `%` (remind's "end of message" marker) is removed.
pub fn expand_template(
    template: &str,
    date: NaiveDate,
    time: Option<NaiveTime>,
    duration: Option<Duration>,
) -> String {
    let time = time.unwrap_or(NaiveTime::MIN);
    let duration = duration.unwrap_or_else(|| Duration::hours(1));

    let expanded = template
        .replace("%monname%", &date.format("%b").to_string())
        .replace("%mon%", &date.month().to_string())
        .replace("%mday%", &date.day().to_string())
        .replace("%year%", &date.year().to_string())
        .replace("%hour%", &format!("{:02}", time.hour()))
        .replace("%min%", &format!("{:02}", time.minute()))
        .replace("%wdayname%", &date.format("%a").to_string())
        .replace("%wday%", &date.weekday().num_days_from_sunday().to_string())
        .replace("%dura%", &format_duration(duration));

    let trimmed = expanded.trim_end();
    trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end().to_string()
}

/// The REM line that recreates `event`.
pub fn event_line(event: &Event) -> String {
    let mut line = format!("REM {}", format_date(event.date));
    if let Some(time) = event.time {
        line.push_str(&format!(" AT {}", time.format("%H:%M")));
        if let Some(duration) = event.duration {
            line.push_str(&format!(" DURATION {}", format_duration(duration)));
        }
    }

    line.push_str(" MSG ");
    line.push_str(&event.description.replace('%', "%%"));
    if event.priority != Priority::None {
        line.push_str(event.priority.marker());
    }
    for tag in &event.tags {
        let tag = tag.trim_start_matches('@');
        if tag.is_empty() {
            continue;
        }
        line.push_str(" @");
        line.push_str(tag);
    }
    line
}

pub fn quick_line(entry: &QuickEntry) -> String {
    let mut event = Event::untimed(String::new(), entry.date, entry.description.clone());
    event.time = entry.time;
    event.duration = entry.time.and(entry.duration);
    event_line(&event)
}

/// Append `line` to `path`, creating it (0644) when missing.
///
/// Returns the 1-indexed line number the text landed on.
pub fn append_line(path: &Path, line: &str) -> UrdResult<u32> {
    let existing = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;

    let mut text = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(line.trim_end_matches('\n'));
    text.push('\n');
    file.write_all(text.as_bytes())?;

    Ok(existing.lines().count() as u32 + 1)
}

/// Delete the `line_no`-th line (1-indexed).
pub fn remove_line(path: &Path, line_no: u32) -> UrdResult<String> {
    let text = fs::read_to_string(path)?;
    let mut lines: Vec<&str> = text.lines().collect();
    let index = (line_no as usize)
        .checked_sub(1)
        .filter(|i| *i < lines.len())
        .ok_or_else(|| {
            UrdError::NotFound(format!("line {} in {}", line_no, path.display()))
        })?;

    let removed = lines.remove(index).to_string();
    write_lines(path, &lines)?;
    Ok(removed)
}

/// Delete the first line containing `pattern`; returns its line number.
pub fn remove_matching(path: &Path, pattern: &str) -> UrdResult<u32> {
    let text = fs::read_to_string(path)?;
    let mut lines: Vec<&str> = text.lines().collect();
    let index = lines
        .iter()
        .position(|line| line.contains(pattern))
        .ok_or_else(|| {
            UrdError::NotFound(format!("no line matching '{}' in {}", pattern, path.display()))
        })?;

    lines.remove(index);
    write_lines(path, &lines)?;
    Ok(index as u32 + 1)
}

fn write_lines(path: &Path, lines: &[&str]) -> UrdResult<()> {
    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    fs::write(path, text)?;
    Ok(())
}
